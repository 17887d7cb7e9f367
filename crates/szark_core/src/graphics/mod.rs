//! OpenGL rendering primitives
//!
//! Everything here talks to the driver through [`GraphicsDevice`], a narrow
//! id-based view of the handful of GL entry points the library needs. Ids
//! are the raw GL names; `0` means "none" everywhere.

pub mod gl_device;
pub mod renderer;
pub mod shader;
pub mod texture;

use bytemuck::{Pod, Zeroable};

use crate::error::CoreResult;

pub use gl_device::GlDevice;
pub use renderer::QuadRenderer;
pub use shader::{compile_program, DEFAULT_FRAGMENT_SHADER, DEFAULT_VERTEX_SHADER};

/// RGB pixel as the host lays it out
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct Color {
    /// Red
    pub r: u8,
    /// Green
    pub g: u8,
    /// Blue
    pub b: u8,
}

/// Shader pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    /// Vertex stage
    Vertex,
    /// Fragment stage
    Fragment,
}

impl ShaderStage {
    /// Name used in diagnostics
    pub const fn name(self) -> &'static str {
        match self {
            Self::Vertex => "Vertex",
            Self::Fragment => "Fragment",
        }
    }
}

/// Buffer binding point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferTarget {
    /// Vertex attributes
    Array,
    /// Indices
    ElementArray,
}

/// The GL entry points used by the shim
///
/// Implementations must only be used while their context is current.
pub trait GraphicsDevice {
    /// Allocate a texture name
    fn create_texture(&mut self) -> CoreResult<u32>;
    /// Bind a 2D texture (0 unbinds)
    fn bind_texture(&mut self, texture: u32);
    /// Define the bound texture's storage from tightly packed RGB8 pixels
    fn upload_rgb(&mut self, width: i32, height: i32, pixels: &[u8]);
    /// Overwrite the bound texture's contents from tightly packed RGB8 pixels
    fn update_rgb(&mut self, width: i32, height: i32, pixels: &[u8]);
    /// Nearest-neighbour min and mag filters on the bound texture
    fn set_nearest_filtering(&mut self);

    /// Allocate a shader object
    fn create_shader(&mut self, stage: ShaderStage) -> CoreResult<u32>;
    /// Set source and compile; returns the compile status
    fn compile_shader(&mut self, shader: u32, source: &str) -> bool;
    /// Compiler diagnostics
    fn shader_log(&mut self, shader: u32) -> String;
    /// Release a shader object
    fn delete_shader(&mut self, shader: u32);
    /// Allocate a program object
    fn create_program(&mut self) -> CoreResult<u32>;
    /// Attach a compiled stage
    fn attach_shader(&mut self, program: u32, shader: u32);
    /// Detach a stage after linking
    fn detach_shader(&mut self, program: u32, shader: u32);
    /// Link; returns the link status
    fn link_program(&mut self, program: u32) -> bool;
    /// Linker diagnostics
    fn program_log(&mut self, program: u32) -> String;
    /// Release a program
    fn delete_program(&mut self, program: u32);
    /// Bind a program (0 unbinds)
    fn use_program(&mut self, program: u32);

    /// Turn on depth testing with a `LEQUAL` comparison
    fn enable_depth_test(&mut self);
    /// Allocate a vertex array object
    fn create_vertex_array(&mut self) -> CoreResult<u32>;
    /// Bind a vertex array object
    fn bind_vertex_array(&mut self, vertex_array: u32);
    /// Allocate a buffer object
    fn create_buffer(&mut self) -> CoreResult<u32>;
    /// Bind a buffer to `target`
    fn bind_buffer(&mut self, target: BufferTarget, buffer: u32);
    /// Upload immutable data to the buffer bound at `target`
    fn upload_static(&mut self, target: BufferTarget, data: &[u8]);
    /// Describe and enable a float vertex attribute of the bound array buffer
    fn vertex_attribute(&mut self, index: u32, components: i32, stride: i32, offset: i32);
    /// Draw `count` u32 indices from the bound element buffer as triangles
    fn draw_indexed_triangles(&mut self, count: i32);
    /// Set the viewport rectangle
    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32);
}

/// GL state tied to the context `Show` made current
pub struct Graphics {
    /// Driver access
    pub device: Box<dyn GraphicsDevice>,
    /// Default quad and shader
    pub renderer: QuadRenderer,
}

impl Graphics {
    /// Wrap a freshly loaded device; the renderer starts uninitialized
    pub fn new(device: Box<dyn GraphicsDevice>) -> Self {
        Self {
            device,
            renderer: QuadRenderer::default(),
        }
    }
}

#[cfg(test)]
pub(crate) mod fake {
    //! Recording graphics device shared by the crate's tests
    //!
    //! Shader sources containing `SYNTAX_ERROR` fail to compile; programs
    //! with a stage containing `LINK_ERROR` fail to link.

    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    use super::{BufferTarget, GraphicsDevice, ShaderStage};
    use crate::error::CoreResult;

    #[derive(Default)]
    pub struct GlState {
        pub calls: Vec<String>,
        next_id: u32,
        sources: HashMap<u32, String>,
        attached: HashMap<u32, Vec<u32>>,
    }

    /// Shared view of everything a [`FakeDevice`] did
    #[derive(Clone, Default)]
    pub struct GlLog(pub Rc<RefCell<GlState>>);

    impl GlLog {
        pub fn calls(&self) -> Vec<String> {
            self.0.borrow().calls.clone()
        }

        pub fn clear(&self) {
            self.0.borrow_mut().calls.clear();
        }

        pub fn count(&self, prefix: &str) -> usize {
            self.0.borrow().calls.iter().filter(|c| c.starts_with(prefix)).count()
        }
    }

    pub struct FakeDevice {
        log: GlLog,
    }

    impl FakeDevice {
        pub fn new(log: GlLog) -> Self {
            Self { log }
        }

        fn record(&self, call: String) {
            self.log.0.borrow_mut().calls.push(call);
        }

        fn next_id(&self) -> u32 {
            let mut state = self.log.0.borrow_mut();
            state.next_id += 1;
            state.next_id
        }
    }

    impl GraphicsDevice for FakeDevice {
        fn create_texture(&mut self) -> CoreResult<u32> {
            let id = self.next_id();
            self.record(format!("create_texture {id}"));
            Ok(id)
        }

        fn bind_texture(&mut self, texture: u32) {
            self.record(format!("bind_texture {texture}"));
        }

        fn upload_rgb(&mut self, width: i32, height: i32, pixels: &[u8]) {
            self.record(format!("upload_rgb {width}x{height} {}", pixels.len()));
        }

        fn update_rgb(&mut self, width: i32, height: i32, pixels: &[u8]) {
            self.record(format!("update_rgb {width}x{height} {}", pixels.len()));
        }

        fn set_nearest_filtering(&mut self) {
            self.record("set_nearest_filtering".to_string());
        }

        fn create_shader(&mut self, stage: ShaderStage) -> CoreResult<u32> {
            let id = self.next_id();
            self.record(format!("create_shader {stage:?} {id}"));
            Ok(id)
        }

        fn compile_shader(&mut self, shader: u32, source: &str) -> bool {
            self.record(format!("compile_shader {shader}"));
            self.log.0.borrow_mut().sources.insert(shader, source.to_string());
            !source.contains("SYNTAX_ERROR")
        }

        fn shader_log(&mut self, shader: u32) -> String {
            format!("0:1: syntax error in shader {shader}\n")
        }

        fn delete_shader(&mut self, shader: u32) {
            self.record(format!("delete_shader {shader}"));
        }

        fn create_program(&mut self) -> CoreResult<u32> {
            let id = self.next_id();
            self.record(format!("create_program {id}"));
            Ok(id)
        }

        fn attach_shader(&mut self, program: u32, shader: u32) {
            self.record(format!("attach_shader {program} {shader}"));
            self.log.0.borrow_mut().attached.entry(program).or_default().push(shader);
        }

        fn detach_shader(&mut self, program: u32, shader: u32) {
            self.record(format!("detach_shader {program} {shader}"));
        }

        fn link_program(&mut self, program: u32) -> bool {
            self.record(format!("link_program {program}"));
            let state = self.log.0.borrow();
            let stages = state.attached.get(&program).cloned().unwrap_or_default();
            !stages.iter().any(|shader| {
                state.sources.get(shader).is_some_and(|source| source.contains("LINK_ERROR"))
            })
        }

        fn program_log(&mut self, program: u32) -> String {
            format!("error: varying mismatch in program {program}")
        }

        fn delete_program(&mut self, program: u32) {
            self.record(format!("delete_program {program}"));
        }

        fn use_program(&mut self, program: u32) {
            self.record(format!("use_program {program}"));
        }

        fn enable_depth_test(&mut self) {
            self.record("enable_depth_test".to_string());
        }

        fn create_vertex_array(&mut self) -> CoreResult<u32> {
            let id = self.next_id();
            self.record(format!("create_vertex_array {id}"));
            Ok(id)
        }

        fn bind_vertex_array(&mut self, vertex_array: u32) {
            self.record(format!("bind_vertex_array {vertex_array}"));
        }

        fn create_buffer(&mut self) -> CoreResult<u32> {
            let id = self.next_id();
            self.record(format!("create_buffer {id}"));
            Ok(id)
        }

        fn bind_buffer(&mut self, target: BufferTarget, buffer: u32) {
            self.record(format!("bind_buffer {target:?} {buffer}"));
        }

        fn upload_static(&mut self, target: BufferTarget, data: &[u8]) {
            self.record(format!("upload_static {target:?} {}", data.len()));
        }

        fn vertex_attribute(&mut self, index: u32, components: i32, stride: i32, offset: i32) {
            self.record(format!("vertex_attribute {index} {components} {stride} {offset}"));
        }

        fn draw_indexed_triangles(&mut self, count: i32) {
            self.record(format!("draw_indexed_triangles {count}"));
        }

        fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
            self.record(format!("viewport {x} {y} {width} {height}"));
        }
    }
}
