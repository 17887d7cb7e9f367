//! Shader program compilation

use super::{GraphicsDevice, ShaderStage};
use crate::error::{CoreError, CoreResult};

/// Built-in vertex stage: pass-through position, flipped vertically
pub const DEFAULT_VERTEX_SHADER: &str = "#version 330 core
layout(location = 0) in vec2 pos;
layout(location = 1) in vec2 tex;
out vec2 texCoord;
void main() {
    texCoord = tex;
    gl_Position = vec4(pos.x, -pos.y, 0.0, 1.0);
}
";

/// Built-in fragment stage: straight texture sample
pub const DEFAULT_FRAGMENT_SHADER: &str = "#version 330 core
out vec4 FragColor;
in vec2 texCoord;
uniform sampler2D tex;
void main() {
    FragColor = texture(tex, texCoord);
}
";

/// Compile and link a vertex + fragment pair into a program
///
/// The fragment stage is only created once the vertex stage compiled. Every
/// object created along a failing path is deleted again; on success the
/// stages are detached from the program but left alive.
pub fn compile_program(
    device: &mut dyn GraphicsDevice,
    vertex_source: &str,
    fragment_source: &str,
) -> CoreResult<u32> {
    let vertex = compile_stage(device, ShaderStage::Vertex, vertex_source)?;
    let fragment = match compile_stage(device, ShaderStage::Fragment, fragment_source) {
        Ok(fragment) => fragment,
        Err(err) => {
            device.delete_shader(vertex);
            return Err(err);
        }
    };

    let program = match device.create_program() {
        Ok(program) => program,
        Err(err) => {
            device.delete_shader(vertex);
            device.delete_shader(fragment);
            return Err(err);
        }
    };

    device.attach_shader(program, vertex);
    device.attach_shader(program, fragment);

    if !device.link_program(program) {
        let log = device.program_log(program);
        device.delete_program(program);
        device.delete_shader(vertex);
        device.delete_shader(fragment);
        return Err(CoreError::ProgramLink(log.trim_end().to_string()));
    }

    device.detach_shader(program, vertex);
    device.detach_shader(program, fragment);
    log::debug!("linked shader program {program}");
    Ok(program)
}

fn compile_stage(
    device: &mut dyn GraphicsDevice,
    stage: ShaderStage,
    source: &str,
) -> CoreResult<u32> {
    let shader = device.create_shader(stage)?;
    if device.compile_shader(shader, source) {
        return Ok(shader);
    }

    let log = device.shader_log(shader);
    device.delete_shader(shader);
    Err(CoreError::ShaderCompile {
        stage: stage.name(),
        log: log.trim_end().to_string(),
    })
}
