use std::cell::Cell;
use std::collections::BTreeMap;

use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};

use super::frontend::write_uniform;
use super::{BoundShader, MatrixConvention, ShaderId, UniformError, UniformStaging, UniformType};

/// A run-time uniform value tagged with its GPU type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Int(i32),
    UInt(u32),
    Mat3([f32; 9]),
    Mat4([f32; 16]),
}

impl UniformValue {
    pub fn ty(&self) -> UniformType {
        match self {
            Self::Float(_) => UniformType::Float,
            Self::Vec2(_) => UniformType::Vec2,
            Self::Vec3(_) => UniformType::Vec3,
            Self::Vec4(_) => UniformType::Vec4,
            Self::Int(_) => UniformType::Int,
            Self::UInt(_) => UniformType::UInt,
            Self::Mat3(_) => UniformType::Mat3,
            Self::Mat4(_) => UniformType::Mat4,
        }
    }

    /// Column-major host bytes.
    pub fn bytes(&self) -> &[u8] {
        match self {
            Self::Float(v) => bytemuck::bytes_of(v),
            Self::Vec2(v) => bytemuck::bytes_of(v),
            Self::Vec3(v) => bytemuck::bytes_of(v),
            Self::Vec4(v) => bytemuck::bytes_of(v),
            Self::Int(v) => bytemuck::bytes_of(v),
            Self::UInt(v) => bytemuck::bytes_of(v),
            Self::Mat3(v) => bytemuck::bytes_of(v),
            Self::Mat4(v) => bytemuck::bytes_of(v),
        }
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for UniformValue {
    fn from(v: u32) -> Self {
        Self::UInt(v)
    }
}

impl From<Vec2> for UniformValue {
    fn from(v: Vec2) -> Self {
        Self::Vec2(v.to_array())
    }
}

impl From<Vec3> for UniformValue {
    fn from(v: Vec3) -> Self {
        Self::Vec3(v.to_array())
    }
}

impl From<Vec4> for UniformValue {
    fn from(v: Vec4) -> Self {
        Self::Vec4(v.to_array())
    }
}

impl From<Mat3> for UniformValue {
    fn from(m: Mat3) -> Self {
        Self::Mat3(m.to_cols_array())
    }
}

impl From<Mat4> for UniformValue {
    fn from(m: Mat4) -> Self {
        Self::Mat4(m.to_cols_array())
    }
}

/// Named uniform values set at run time (materials).
///
/// Values the bound program does not expose are skipped, since a material
/// is shared by shaders that may not use every parameter. Types are checked
/// once per program and re-checked only after the set of names or types
/// changes.
#[derive(Debug, Clone, Default)]
pub struct UniformMap {
    values: BTreeMap<String, UniformValue>,
    validated_for: Cell<Option<ShaderId>>,
}

impl UniformMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<UniformValue>) {
        let value = value.into();
        let name = name.into();
        let same_shape = self.values.get(&name).is_some_and(|old| old.ty() == value.ty());
        if !same_shape {
            self.validated_for.set(None);
        }
        self.values.insert(name, value);
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<&UniformValue> {
        self.values.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<UniformValue> {
        self.validated_for.set(None);
        self.values.remove(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &UniformValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Checks every value against the program's reflection.
    pub fn validate(&self, bound: &BoundShader<'_>) -> Result<(), UniformError> {
        if self.validated_for.get() == Some(bound.id()) {
            return Ok(());
        }
        let reflection = bound.program().reflection();
        for (name, value) in &self.values {
            let Some(info) = reflection.uniform(name) else { continue };
            if info.ty != value.ty() {
                return Err(UniformError::TypeMismatch {
                    name: name.clone(),
                    expected: value.ty(),
                    actual: info.ty,
                });
            }
            if info.array_len != 1 {
                return Err(UniformError::ArrayLengthMismatch {
                    name: name.clone(),
                    expected: 1,
                    actual: info.array_len,
                });
            }
        }
        self.validated_for.set(Some(bound.id()));
        Ok(())
    }

    /// Stages all values the bound program uses.
    pub fn upload(&self, bound: &BoundShader<'_>, staging: &mut UniformStaging) -> Result<(), UniformError> {
        self.validate(bound)?;
        let reflection = bound.program().reflection();
        for (name, value) in &self.values {
            let Some(info) = reflection.uniform(name) else { continue };
            let dst = staging.block_mut(info.group, info.binding, info.block_size);
            write_uniform(name, dst, info, value.bytes(), MatrixConvention::ColumnMajor)?;
        }
        Ok(())
    }
}

impl PartialEq for UniformMap {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}
