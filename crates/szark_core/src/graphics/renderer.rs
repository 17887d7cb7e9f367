//! Default full-screen quad and shader

use super::shader::{compile_program, DEFAULT_FRAGMENT_SHADER, DEFAULT_VERTEX_SHADER};
use super::{BufferTarget, GraphicsDevice};
use crate::error::{CoreError, CoreResult};

/// Interleaved `[x, y, u, v]` for the four quad corners
pub const QUAD_VERTICES: [f32; 16] = [
    // Pos      | Coords
    1.0, 1.0, 1.0, 1.0, //
    1.0, -1.0, 1.0, 0.0, //
    -1.0, -1.0, 0.0, 0.0, //
    -1.0, 1.0, 0.0, 1.0,
];

/// Two triangles over [`QUAD_VERTICES`]
pub const QUAD_INDICES: [u32; 6] = [0, 1, 3, 1, 2, 3];

const VERTEX_STRIDE: i32 = 16;
const TEXCOORD_OFFSET: i32 = 8;

#[derive(Debug, Clone, Copy)]
struct QuadState {
    program: u32,
    vertex_array: u32,
    index_buffer: u32,
}

/// Owner of the default quad geometry and shader for one context
#[derive(Debug, Default)]
pub struct QuadRenderer {
    state: Option<QuadState>,
}

impl QuadRenderer {
    /// Default program id, 0 before initialization
    pub fn default_program(&self) -> u32 {
        self.state.map_or(0, |state| state.program)
    }

    /// Compile the default shader and upload the quad
    ///
    /// Nothing is marked initialized unless every step succeeds. Calling it
    /// again once initialized does nothing.
    pub fn initialize(&mut self, device: &mut dyn GraphicsDevice) -> CoreResult<()> {
        if self.state.is_some() {
            log::debug!("renderer already initialized");
            return Ok(());
        }

        device.enable_depth_test();

        let program = compile_program(device, DEFAULT_VERTEX_SHADER, DEFAULT_FRAGMENT_SHADER)
            .map_err(|err| {
                log::error!("default shader: {err}");
                CoreError::DefaultShader
            })?;

        let vertex_array = device.create_vertex_array()?;
        device.bind_vertex_array(vertex_array);

        let vertex_buffer = device.create_buffer()?;
        device.bind_buffer(BufferTarget::Array, vertex_buffer);
        device.upload_static(BufferTarget::Array, bytemuck::cast_slice(&QUAD_VERTICES));

        let index_buffer = device.create_buffer()?;
        device.bind_buffer(BufferTarget::ElementArray, index_buffer);
        device.upload_static(BufferTarget::ElementArray, bytemuck::cast_slice(&QUAD_INDICES));

        device.vertex_attribute(0, 2, VERTEX_STRIDE, 0);
        device.vertex_attribute(1, 2, VERTEX_STRIDE, TEXCOORD_OFFSET);

        self.state = Some(QuadState {
            program,
            vertex_array,
            index_buffer,
        });
        log::info!("renderer initialized (default program {program})");
        Ok(())
    }

    /// Draw the quad with the default shader
    pub fn render(&self, device: &mut dyn GraphicsDevice) -> CoreResult<()> {
        let state = self.state.ok_or(CoreError::RendererNotInitialized)?;
        device.use_program(state.program);
        device.bind_vertex_array(state.vertex_array);
        device.bind_buffer(BufferTarget::ElementArray, state.index_buffer);
        device.draw_indexed_triangles(QUAD_INDICES.len() as i32);
        Ok(())
    }
}
