//! Shader programs and typed uniform binding.
//!
//! WGSL is parsed and validated with `naga` before any GPU object exists, and
//! the validated module is reflected once: uniform names map to byte offsets
//! inside their block (the "location" of a uniform), texture and sampler
//! bindings are recorded by name, and vertex inputs by shader location.
//!
//! Two ways to feed uniforms:
//! - [`ShaderFrontend`] binds a statically declared [`UniformBlock`] (see
//!   [`uniform_block!`](crate::uniform_block)) to a program. Names, types and
//!   array lengths are checked at bind time; uploads only copy bytes.
//! - [`UniformMap`] holds run-time named values (materials) and validates
//!   them once per program.
//!
//! Both write into a [`UniformStaging`], which the draw queue turns into GPU
//! buffer contents.

mod error;
mod frontend;
mod program;
mod reflection;
mod types;
mod value;

pub use error::{ShaderError, UniformError};
pub use frontend::{ShaderFrontend, UniformBlock, UniformStaging};
pub use program::{BoundShader, Shader, ShaderId, ShaderProgram};
pub use reflection::{base_name, AttributeInfo, BlockInfo, ResourceInfo, ResourceKind, ShaderReflection, UniformInfo};
pub use types::{MatrixConvention, UniformDecl, UniformType};
pub use value::{UniformMap, UniformValue};

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r#"
struct Uniforms {
    model: mat4x4<f32>,
    normal_matrix: mat3x3<f32>,
    tint: vec4<f32>,
    alpha_mask: f32,
    palette: array<vec4<f32>, 4>,
};

@group(0) @binding(0) var<uniform> u: Uniforms;
@group(0) @binding(1) var<uniform> unused: vec4<f32>;
@group(1) @binding(0) var t_diffuse: texture_2d<f32>;
@group(1) @binding(1) var s_diffuse: sampler;

struct VsIn {
    @location(0) position: vec3<f32>,
    @location(2) tex_coord: vec2<f32>,
};

struct VsOut {
    @builtin(position) clip: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(in: VsIn) -> VsOut {
    var out: VsOut;
    out.clip = u.model * vec4<f32>(in.position, 1.0);
    out.uv = in.tex_coord;
    return out;
}

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    let n = u.normal_matrix * vec3<f32>(0.0, 0.0, 1.0);
    let base = textureSample(t_diffuse, s_diffuse, in.uv) * u.tint * u.palette[0];
    return base * u.alpha_mask + vec4<f32>(n, 0.0);
}
"#;

    fn program() -> ShaderProgram {
        ShaderProgram::from_source("test", SOURCE).unwrap()
    }

    fn f32_at(bytes: &[u8], offset: usize) -> f32 {
        bytemuck::pod_read_unaligned(&bytes[offset..offset + 4])
    }

    crate::uniform_block! {
        struct TestBlock {
            model: Mat4 => [f32; 16],
            normal_matrix: Mat3 @RowMajor => [f32; 9],
            alpha_mask: Float => f32,
            palette: Vec4[4] => [[f32; 4]; 4],
        }
    }

    crate::uniform_block! {
        struct MissingBlock {
            glow: Float => f32,
        }
    }

    crate::uniform_block! {
        struct WrongTypeBlock {
            tint: Vec3 => [f32; 3],
        }
    }

    crate::uniform_block! {
        struct WrongLengthBlock {
            palette: Vec4[2] => [[f32; 4]; 2],
        }
    }

    // ── reflection ────────────────────────────────────────────────────────

    #[test]
    fn reflection_reports_offsets_and_types() {
        let p = program();
        let r = p.reflection();

        let model = r.uniform("model").unwrap();
        assert_eq!((model.offset, model.ty, model.array_len), (0, UniformType::Mat4, 1));
        assert_eq!(r.uniform("normal_matrix").unwrap().offset, 64);
        assert_eq!(r.uniform("tint").unwrap().offset, 112);
        assert_eq!(r.uniform("alpha_mask").unwrap().offset, 128);

        let palette = r.uniform("palette").unwrap();
        assert_eq!((palette.offset, palette.array_len, palette.stride), (144, 4, 16));
        assert_eq!(r.uniform("palette[2]"), Some(palette));

        assert_eq!(r.block(0, 0).unwrap().size, 208);
        assert_eq!(r.group_count(), 2);
    }

    #[test]
    fn inactive_globals_are_excluded() {
        let p = program();
        assert!(p.reflection().block(0, 1).is_none());
        assert!(p.reflection().uniform("unused").is_none());
    }

    #[test]
    fn resources_and_attributes_are_reflected() {
        let p = program();
        let r = p.reflection();

        let (key, tex) = r.resource_by_name("t_diffuse").unwrap();
        assert_eq!(key, (1, 0));
        assert!(matches!(tex.kind, ResourceKind::Texture { .. }));
        assert!(tex.visibility.contains(wgpu::ShaderStages::FRAGMENT));
        let (key, sampler) = r.resource_by_name("s_diffuse").unwrap();
        assert_eq!(key, (1, 1));
        assert_eq!(sampler.kind, ResourceKind::Sampler { comparison: false });

        let pos = r.attribute("position").unwrap();
        assert_eq!((pos.location, pos.ty), (0, UniformType::Vec3));
        assert_eq!(r.attribute("tex_coord").unwrap().location, 2);
        assert!(r.attribute("normal").is_none());
        assert_eq!(r.vertex_entry(), Some("vs_main"));
        assert_eq!(r.fragment_entry(), Some("fs_main"));
    }

    #[test]
    fn parse_failure_returns_compile_error_with_log() {
        let err = ShaderProgram::from_source("broken", "fn oops( {").unwrap_err();
        let ShaderError::Compile { label, log } = err else { panic!("expected compile error") };
        assert_eq!(label, "broken");
        assert!(!log.is_empty());
    }

    #[test]
    fn validation_failure_returns_compile_error() {
        let src = "@fragment fn fs_main() -> @location(0) vec4<f32> { let x: f32 = vec2<f32>(1.0, 2.0); return vec4<f32>(x); }";
        assert!(matches!(ShaderProgram::from_source("bad", src), Err(ShaderError::Compile { .. })));
    }

    #[test]
    fn programs_get_distinct_ids() {
        assert_ne!(program().id(), program().id());
    }

    // ── frontend ──────────────────────────────────────────────────────────

    #[test]
    fn frontend_writes_at_reflected_offsets() {
        let p = program();
        let frontend = ShaderFrontend::<TestBlock>::bind(&p).unwrap();

        let mut block = TestBlock::default();
        block.model = glam::Mat4::from_translation(glam::Vec3::new(1.0, 2.0, 3.0)).to_cols_array();
        block.normal_matrix = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0];
        block.alpha_mask = 0.5;
        block.palette[1] = [0.1, 0.2, 0.3, 0.4];

        let mut staging = UniformStaging::new();
        frontend.upload(&p.bind(), &block, &mut staging).unwrap();
        let bytes = staging.block(0, 0).unwrap();

        assert_eq!(bytes.len(), 208);
        assert_eq!(f32_at(bytes, 48), 1.0);
        assert_eq!(f32_at(bytes, 56), 3.0);
        // Row-major 3×3 is transposed into padded columns.
        assert_eq!([f32_at(bytes, 64), f32_at(bytes, 68), f32_at(bytes, 72)], [1.0, 4.0, 7.0]);
        assert_eq!([f32_at(bytes, 80), f32_at(bytes, 84), f32_at(bytes, 88)], [2.0, 5.0, 8.0]);
        assert_eq!(f32_at(bytes, 76), 0.0);
        assert_eq!(f32_at(bytes, 128), 0.5);
        assert_eq!(f32_at(bytes, 160), 0.1);
        assert_eq!(f32_at(bytes, 172), 0.4);
    }

    #[test]
    fn bind_reports_missing_uniform() {
        let err = ShaderFrontend::<MissingBlock>::bind(&program()).unwrap_err();
        assert_eq!(err, UniformError::Missing { name: "glow".into(), shader: "test".into() });
    }

    #[test]
    fn bind_reports_type_mismatch() {
        let err = ShaderFrontend::<WrongTypeBlock>::bind(&program()).unwrap_err();
        assert_eq!(
            err,
            UniformError::TypeMismatch { name: "tint".into(), expected: UniformType::Vec3, actual: UniformType::Vec4 }
        );
    }

    #[test]
    fn bind_reports_array_length_mismatch() {
        let err = ShaderFrontend::<WrongLengthBlock>::bind(&program()).unwrap_err();
        assert_eq!(err, UniformError::ArrayLengthMismatch { name: "palette".into(), expected: 2, actual: 4 });
    }

    #[test]
    fn bind_reports_storage_size_mismatch_for_hand_written_blocks() {
        #[derive(Debug)]
        struct Sloppy(f32);
        impl UniformBlock for Sloppy {
            const DECLS: &'static [UniformDecl] = &[UniformDecl {
                name: "tint",
                ty: UniformType::Vec4,
                array_len: 1,
                convention: MatrixConvention::ColumnMajor,
                storage_size: 4,
            }];
            fn field_bytes(&self, _index: usize) -> Option<&[u8]> {
                Some(bytemuck::bytes_of(&self.0))
            }
        }
        let err = ShaderFrontend::<Sloppy>::bind(&program()).unwrap_err();
        assert_eq!(err, UniformError::StorageSizeMismatch { name: "tint".into(), expected: 16, actual: 4 });
    }

    #[test]
    fn upload_requires_the_frontend_shader_to_be_bound() {
        let a = program();
        let b = program();
        let frontend = ShaderFrontend::<TestBlock>::bind(&a).unwrap();
        let mut staging = UniformStaging::new();
        let err = frontend.upload(&b.bind(), &TestBlock::default(), &mut staging).unwrap_err();
        assert!(matches!(err, UniformError::ShaderNotBound { .. }));
        assert!(staging.is_empty());
    }

    // ── uniform maps ──────────────────────────────────────────────────────

    #[test]
    fn uniform_map_skips_inactive_and_writes_active() {
        let p = program();
        let mut material = UniformMap::new();
        material.set("tint", glam::Vec4::new(1.0, 0.5, 0.25, 1.0));
        material.set("glow", 3.0f32);

        let mut staging = UniformStaging::new();
        material.upload(&p.bind(), &mut staging).unwrap();
        let bytes = staging.block(0, 0).unwrap();
        assert_eq!(f32_at(bytes, 116), 0.5);
    }

    #[test]
    fn uniform_map_rejects_wrong_type_and_revalidates_after_change() {
        let p = program();
        let mut material = UniformMap::new();
        material.set("alpha_mask", 1.0f32);
        let mut staging = UniformStaging::new();
        material.upload(&p.bind(), &mut staging).unwrap();

        material.set("alpha_mask", glam::Vec3::ONE);
        let err = material.upload(&p.bind(), &mut staging).unwrap_err();
        assert!(matches!(err, UniformError::TypeMismatch { .. }));
    }
}
