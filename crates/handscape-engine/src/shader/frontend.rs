use std::collections::BTreeMap;
use std::marker::PhantomData;

use super::{BoundShader, MatrixConvention, ShaderId, ShaderProgram, UniformDecl, UniformError, UniformInfo};

/// A host struct whose fields map one-to-one onto named shader uniforms.
///
/// Implemented by [`uniform_block!`](crate::uniform_block); hand-written
/// implementations are checked at bind time instead of compile time.
pub trait UniformBlock {
    const DECLS: &'static [UniformDecl];

    /// Raw bytes of the field declared at `DECLS[index]`.
    fn field_bytes(&self, index: usize) -> Option<&[u8]>;
}

/// Declares a `#[repr(C)]` uniform struct together with its
/// [`UniformBlock`] description.
///
/// Each field names its GPU type, an optional `[array length]`, an optional
/// `@RowMajor` matrix convention, and its host storage type. A `const`
/// assertion rejects storage whose size does not match the GPU type.
///
/// ```ignore
/// uniform_block! {
///     pub struct ObjectUniforms {
///         model: Mat4 => [f32; 16],
///         alpha_mask: Float => f32,
///         palette: Vec4[4] => [[f32; 4]; 4],
///     }
/// }
/// ```
#[macro_export]
macro_rules! uniform_block {
    (@len) => { 1u32 };
    (@len $len:literal) => { $len };
    (@conv) => { $crate::shader::MatrixConvention::ColumnMajor };
    (@conv $conv:ident) => { $crate::shader::MatrixConvention::$conv };

    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $( $field:ident : $ty:ident $([$len:literal])? $(@ $conv:ident)? => $store:ty ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(C)]
        #[derive(Debug, Copy, Clone, Default, ::bytemuck::Pod, ::bytemuck::Zeroable)]
        $vis struct $name {
            $( pub $field: $store, )*
        }

        const _: () = {
            $(
                assert!(
                    ::core::mem::size_of::<$store>()
                        == ($crate::uniform_block!(@len $($len)?) as usize)
                            * ($crate::shader::UniformType::$ty.component_count() as usize)
                            * ($crate::shader::UniformType::$ty.component_size() as usize),
                    concat!("uniform field `", stringify!($field), "` storage does not match its GPU type"),
                );
            )*
        };

        impl $crate::shader::UniformBlock for $name {
            const DECLS: &'static [$crate::shader::UniformDecl] = &[
                $(
                    $crate::shader::UniformDecl {
                        name: stringify!($field),
                        ty: $crate::shader::UniformType::$ty,
                        array_len: $crate::uniform_block!(@len $($len)?),
                        convention: $crate::uniform_block!(@conv $($conv)?),
                        storage_size: ::core::mem::size_of::<$store>(),
                    },
                )*
            ];

            fn field_bytes(&self, index: usize) -> Option<&[u8]> {
                let fields: &[&[u8]] = &[ $( ::bytemuck::bytes_of(&self.$field), )* ];
                fields.get(index).copied()
            }
        }
    };
}

// ── staging ───────────────────────────────────────────────────────────────

/// CPU copies of uniform blocks, keyed by `(group, binding)`, waiting to be
/// written to the GPU.
#[derive(Debug, Clone, Default)]
pub struct UniformStaging {
    blocks: BTreeMap<(u32, u32), Vec<u8>>,
}

impl UniformStaging {
    pub fn new() -> Self {
        Self::default()
    }

    /// The staged bytes of a block, grown (zero-filled) to at least `size`.
    pub fn block_mut(&mut self, group: u32, binding: u32, size: u32) -> &mut [u8] {
        let block = self.blocks.entry((group, binding)).or_default();
        if block.len() < size as usize {
            block.resize(size as usize, 0);
        }
        block
    }

    #[inline]
    pub fn block(&self, group: u32, binding: u32) -> Option<&[u8]> {
        self.blocks.get(&(group, binding)).map(Vec::as_slice)
    }

    pub fn blocks(&self) -> impl Iterator<Item = ((u32, u32), &[u8])> {
        self.blocks.iter().map(|(k, v)| (*k, v.as_slice()))
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn clear(&mut self) {
        self.blocks.clear();
    }
}

/// Writes tightly packed host data for one uniform into its block, honoring
/// the reflected array stride and matrix column padding.
pub(crate) fn write_uniform(
    name: &str,
    dst: &mut [u8],
    info: &UniformInfo,
    src: &[u8],
    convention: MatrixConvention,
) -> Result<(), UniformError> {
    let elem_size = info.ty.host_size() as usize;
    let expected = elem_size * info.array_len as usize;
    if src.len() != expected {
        return Err(UniformError::StorageSizeMismatch { name: name.to_owned(), expected, actual: src.len() });
    }

    let footprint = match info.ty.matrix_dims() {
        None => elem_size,
        Some((cols, rows)) => ((cols - 1) * info.ty.column_stride() + rows * 4) as usize,
    };
    let needed = info.offset as usize + (info.array_len.max(1) as usize - 1) * info.stride as usize + footprint;
    if dst.len() < needed {
        return Err(UniformError::StorageSizeMismatch { name: name.to_owned(), expected: needed, actual: dst.len() });
    }

    for (i, elem) in src.chunks_exact(elem_size).enumerate() {
        let base = info.offset as usize + i * info.stride as usize;
        match info.ty.matrix_dims() {
            None => dst[base..base + elem_size].copy_from_slice(elem),
            Some((cols, rows)) => {
                let (cols, rows) = (cols as usize, rows as usize);
                let col_stride = info.ty.column_stride() as usize;
                for c in 0..cols {
                    for r in 0..rows {
                        let src_index = match convention {
                            MatrixConvention::ColumnMajor => c * rows + r,
                            MatrixConvention::RowMajor => r * cols + c,
                        };
                        let at = base + c * col_stride + r * 4;
                        dst[at..at + 4].copy_from_slice(&elem[src_index * 4..src_index * 4 + 4]);
                    }
                }
            }
        }
    }
    Ok(())
}

// ── frontend ──────────────────────────────────────────────────────────────

/// A [`UniformBlock`] bound to one program's reflected uniform locations.
///
/// Binding validates every declared uniform once; uploads afterwards only
/// copy bytes.
#[derive(Debug)]
pub struct ShaderFrontend<B> {
    shader: ShaderId,
    label: String,
    fields: Vec<UniformInfo>,
    _block: PhantomData<fn(&B)>,
}

impl<B: UniformBlock> ShaderFrontend<B> {
    pub fn bind(program: &ShaderProgram) -> Result<Self, UniformError> {
        let reflection = program.reflection();
        let mut fields = Vec::with_capacity(B::DECLS.len());

        for decl in B::DECLS {
            let expected = decl.expected_storage_size();
            if decl.storage_size != expected {
                return Err(UniformError::StorageSizeMismatch {
                    name: decl.name.to_owned(),
                    expected,
                    actual: decl.storage_size,
                });
            }
            let Some(info) = reflection.uniform(decl.name) else {
                return Err(UniformError::Missing {
                    name: decl.name.to_owned(),
                    shader: program.label().to_owned(),
                });
            };
            if info.ty != decl.ty {
                return Err(UniformError::TypeMismatch {
                    name: decl.name.to_owned(),
                    expected: decl.ty,
                    actual: info.ty,
                });
            }
            if info.array_len != decl.array_len {
                return Err(UniformError::ArrayLengthMismatch {
                    name: decl.name.to_owned(),
                    expected: decl.array_len,
                    actual: info.array_len,
                });
            }
            fields.push(*info);
        }

        Ok(Self { shader: program.id(), label: program.label().to_owned(), fields, _block: PhantomData })
    }

    #[inline]
    pub fn shader_id(&self) -> ShaderId {
        self.shader
    }

    /// Stages every field of `block` for the bound program.
    pub fn upload(&self, bound: &BoundShader<'_>, block: &B, staging: &mut UniformStaging) -> Result<(), UniformError> {
        if bound.id() != self.shader {
            return Err(UniformError::ShaderNotBound {
                expected: self.label.clone(),
                bound: bound.program().label().to_owned(),
            });
        }

        for (index, (decl, info)) in B::DECLS.iter().zip(&self.fields).enumerate() {
            let Some(bytes) = block.field_bytes(index) else { continue };
            let dst = staging.block_mut(info.group, info.binding, info.block_size);
            write_uniform(decl.name, dst, info, bytes, decl.convention)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::UniformType;

    fn info(ty: UniformType, offset: u32, array_len: u32, stride: u32) -> UniformInfo {
        UniformInfo { group: 0, binding: 0, offset, ty, array_len, stride, block_size: 64 }
    }

    #[test]
    fn matrices_land_on_padded_columns() {
        let mut dst = vec![0u8; 48];
        let src: Vec<u8> = (1..=9u32).flat_map(|v| (v as f32).to_le_bytes()).collect();
        write_uniform("m", &mut dst, &info(UniformType::Mat3, 0, 1, 48), &src, MatrixConvention::ColumnMajor)
            .unwrap();
        let at = |i: usize| f32::from_le_bytes(dst[i * 4..i * 4 + 4].try_into().unwrap());
        assert_eq!([at(0), at(1), at(2), at(4), at(8), at(10)], [1.0, 2.0, 3.0, 4.0, 7.0, 9.0]);
    }

    #[test]
    fn writes_past_the_staged_block_are_rejected() {
        let mut dst = vec![0u8; 16];
        let vec4 = [0u8; 16];
        let err = write_uniform("tint", &mut dst, &info(UniformType::Vec4, 8, 1, 16), &vec4, MatrixConvention::ColumnMajor)
            .unwrap_err();
        assert_eq!(err, UniformError::StorageSizeMismatch { name: "tint".into(), expected: 24, actual: 16 });

        let mut dst = vec![0u8; 32];
        let floats = [1u8; 12];
        let err = write_uniform("w", &mut dst, &info(UniformType::Float, 0, 3, 16), &floats, MatrixConvention::ColumnMajor)
            .unwrap_err();
        assert_eq!(err, UniformError::StorageSizeMismatch { name: "w".into(), expected: 36, actual: 32 });
        assert!(dst.iter().all(|&b| b == 0));
    }
}
