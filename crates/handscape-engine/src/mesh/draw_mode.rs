/// How a vertex sequence is assembled into primitives.
///
/// Mirrors the classic fixed-function set. `LineLoop` and `TriangleFan` have
/// no GPU topology in wgpu and are lowered to index lists at upload time; the
/// adjacency modes can be assembled but not uploaded.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum DrawMode {
    Points,
    Lines,
    LineStrip,
    LineLoop,
    Triangles,
    TriangleStrip,
    TriangleFan,
    LinesAdjacency,
    TrianglesAdjacency,
}

impl DrawMode {
    /// The topology the uploaded index buffer is drawn with.
    pub fn topology(self) -> Option<wgpu::PrimitiveTopology> {
        use wgpu::PrimitiveTopology as T;
        match self {
            Self::Points => Some(T::PointList),
            Self::Lines => Some(T::LineList),
            Self::LineStrip | Self::LineLoop => Some(T::LineStrip),
            Self::Triangles | Self::TriangleFan => Some(T::TriangleList),
            Self::TriangleStrip => Some(T::TriangleStrip),
            Self::LinesAdjacency | Self::TrianglesAdjacency => None,
        }
    }

    #[inline]
    pub fn is_adjacency(self) -> bool {
        matches!(self, Self::LinesAdjacency | Self::TrianglesAdjacency)
    }
}
