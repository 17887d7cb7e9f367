//! `glow` implementation of [`GraphicsDevice`]
#![allow(unsafe_code)]

use std::ffi::c_void;
use std::num::NonZeroU32;

use glow::HasContext;

use super::{BufferTarget, GraphicsDevice, ShaderStage};
use crate::error::{CoreError, CoreResult};

/// OpenGL function table for one context
pub struct GlDevice {
    gl: glow::Context,
}

impl GlDevice {
    /// Load the function table through `loader`
    ///
    /// The context `loader` resolves symbols for must be current.
    pub fn load(mut loader: impl FnMut(&str) -> *const c_void) -> Self {
        // SAFETY: the caller made the context current and `loader` returns
        // that context's entry points.
        let gl = unsafe { glow::Context::from_loader_function(|symbol| loader(symbol)) };
        Self { gl }
    }
}

const fn texture(id: u32) -> Option<glow::NativeTexture> {
    match NonZeroU32::new(id) {
        Some(id) => Some(glow::NativeTexture(id)),
        None => None,
    }
}

const fn shader(id: u32) -> Option<glow::NativeShader> {
    match NonZeroU32::new(id) {
        Some(id) => Some(glow::NativeShader(id)),
        None => None,
    }
}

const fn program(id: u32) -> Option<glow::NativeProgram> {
    match NonZeroU32::new(id) {
        Some(id) => Some(glow::NativeProgram(id)),
        None => None,
    }
}

const fn buffer(id: u32) -> Option<glow::NativeBuffer> {
    match NonZeroU32::new(id) {
        Some(id) => Some(glow::NativeBuffer(id)),
        None => None,
    }
}

const fn vertex_array(id: u32) -> Option<glow::NativeVertexArray> {
    match NonZeroU32::new(id) {
        Some(id) => Some(glow::NativeVertexArray(id)),
        None => None,
    }
}

const fn buffer_target(target: BufferTarget) -> u32 {
    match target {
        BufferTarget::Array => glow::ARRAY_BUFFER,
        BufferTarget::ElementArray => glow::ELEMENT_ARRAY_BUFFER,
    }
}

fn resource(kind: &'static str) -> impl FnOnce(String) -> CoreError {
    move |reason| CoreError::GraphicsResource { kind, reason }
}

impl GraphicsDevice for GlDevice {
    fn create_texture(&mut self) -> CoreResult<u32> {
        let id = unsafe { self.gl.create_texture() }.map_err(resource("texture"))?;
        Ok(id.0.get())
    }

    fn bind_texture(&mut self, id: u32) {
        unsafe { self.gl.bind_texture(glow::TEXTURE_2D, texture(id)) };
    }

    fn upload_rgb(&mut self, width: i32, height: i32, pixels: &[u8]) {
        unsafe {
            self.gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
            self.gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::RGB as i32,
                width,
                height,
                0,
                glow::RGB,
                glow::UNSIGNED_BYTE,
                Some(pixels),
            );
        }
    }

    fn update_rgb(&mut self, width: i32, height: i32, pixels: &[u8]) {
        unsafe {
            self.gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
            self.gl.tex_sub_image_2d(
                glow::TEXTURE_2D,
                0,
                0,
                0,
                width,
                height,
                glow::RGB,
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(pixels),
            );
        }
    }

    fn set_nearest_filtering(&mut self) {
        let nearest = glow::NEAREST as i32;
        unsafe {
            self.gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, nearest);
            self.gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, nearest);
        }
    }

    fn create_shader(&mut self, stage: ShaderStage) -> CoreResult<u32> {
        let kind = match stage {
            ShaderStage::Vertex => glow::VERTEX_SHADER,
            ShaderStage::Fragment => glow::FRAGMENT_SHADER,
        };
        let id = unsafe { self.gl.create_shader(kind) }.map_err(resource("shader"))?;
        Ok(id.0.get())
    }

    fn compile_shader(&mut self, id: u32, source: &str) -> bool {
        let Some(id) = shader(id) else {
            return false;
        };
        unsafe {
            self.gl.shader_source(id, source);
            self.gl.compile_shader(id);
            self.gl.get_shader_compile_status(id)
        }
    }

    fn shader_log(&mut self, id: u32) -> String {
        shader(id).map_or_else(String::new, |id| unsafe { self.gl.get_shader_info_log(id) })
    }

    fn delete_shader(&mut self, id: u32) {
        if let Some(id) = shader(id) {
            unsafe { self.gl.delete_shader(id) };
        }
    }

    fn create_program(&mut self) -> CoreResult<u32> {
        let id = unsafe { self.gl.create_program() }.map_err(resource("program"))?;
        Ok(id.0.get())
    }

    fn attach_shader(&mut self, program_id: u32, shader_id: u32) {
        if let (Some(p), Some(s)) = (program(program_id), shader(shader_id)) {
            unsafe { self.gl.attach_shader(p, s) };
        }
    }

    fn detach_shader(&mut self, program_id: u32, shader_id: u32) {
        if let (Some(p), Some(s)) = (program(program_id), shader(shader_id)) {
            unsafe { self.gl.detach_shader(p, s) };
        }
    }

    fn link_program(&mut self, id: u32) -> bool {
        let Some(id) = program(id) else {
            return false;
        };
        unsafe {
            self.gl.link_program(id);
            self.gl.get_program_link_status(id)
        }
    }

    fn program_log(&mut self, id: u32) -> String {
        program(id).map_or_else(String::new, |id| unsafe { self.gl.get_program_info_log(id) })
    }

    fn delete_program(&mut self, id: u32) {
        if let Some(id) = program(id) {
            unsafe { self.gl.delete_program(id) };
        }
    }

    fn use_program(&mut self, id: u32) {
        unsafe { self.gl.use_program(program(id)) };
    }

    fn enable_depth_test(&mut self) {
        // Texturing needs no switch in a core profile; sampling is always on.
        unsafe {
            self.gl.enable(glow::DEPTH_TEST);
            // The quad is redrawn at the same depth every frame.
            self.gl.depth_func(glow::LEQUAL);
        }
    }

    fn create_vertex_array(&mut self) -> CoreResult<u32> {
        let id = unsafe { self.gl.create_vertex_array() }.map_err(resource("vertex array"))?;
        Ok(id.0.get())
    }

    fn bind_vertex_array(&mut self, id: u32) {
        unsafe { self.gl.bind_vertex_array(vertex_array(id)) };
    }

    fn create_buffer(&mut self) -> CoreResult<u32> {
        let id = unsafe { self.gl.create_buffer() }.map_err(resource("buffer"))?;
        Ok(id.0.get())
    }

    fn bind_buffer(&mut self, target: BufferTarget, id: u32) {
        unsafe { self.gl.bind_buffer(buffer_target(target), buffer(id)) };
    }

    fn upload_static(&mut self, target: BufferTarget, data: &[u8]) {
        unsafe {
            self.gl
                .buffer_data_u8_slice(buffer_target(target), data, glow::STATIC_DRAW);
        }
    }

    fn vertex_attribute(&mut self, index: u32, components: i32, stride: i32, offset: i32) {
        unsafe {
            self.gl
                .vertex_attrib_pointer_f32(index, components, glow::FLOAT, false, stride, offset);
            self.gl.enable_vertex_attrib_array(index);
        }
    }

    fn draw_indexed_triangles(&mut self, count: i32) {
        unsafe { self.gl.draw_elements(glow::TRIANGLES, count, glow::UNSIGNED_INT, 0) };
    }

    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { self.gl.viewport(x, y, width, height) };
    }
}
