//! Shader value types and the registry that maps type keywords onto them.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use super::error::GeneratorError;

/// Scalar element type. `Unknown` marks values whose type could not be inferred.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScalarType {
    Unknown,
    Bool,
    Int,
    UInt,
    Half,
    Float,
    Double,
}

impl ScalarType {
    /// Every concrete scalar type (everything but `Unknown`).
    pub const ALL: [ScalarType; 6] = [
        ScalarType::Bool,
        ScalarType::Int,
        ScalarType::UInt,
        ScalarType::Half,
        ScalarType::Float,
        ScalarType::Double,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ScalarType::Unknown => "unknown",
            ScalarType::Bool => "bool",
            ScalarType::Int => "int",
            ScalarType::UInt => "uint",
            ScalarType::Half => "half",
            ScalarType::Float => "float",
            ScalarType::Double => "double",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SamplerType {
    SamplerState,
    SamplerComparisonState,
}

impl SamplerType {
    pub const ALL: [SamplerType; 2] = [SamplerType::SamplerState, SamplerType::SamplerComparisonState];

    pub fn name(self) -> &'static str {
        match self {
            SamplerType::SamplerState => "SamplerState",
            SamplerType::SamplerComparisonState => "SamplerComparisonState",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureType {
    Texture1D,
    Texture1DArray,
    Texture2D,
    Texture2DArray,
    Texture2DMs,
    Texture2DMsArray,
    Texture3D,
    TextureCube,
    TextureCubeArray,
}

impl TextureType {
    pub const ALL: [TextureType; 9] = [
        TextureType::Texture1D,
        TextureType::Texture1DArray,
        TextureType::Texture2D,
        TextureType::Texture2DArray,
        TextureType::Texture2DMs,
        TextureType::Texture2DMsArray,
        TextureType::Texture3D,
        TextureType::TextureCube,
        TextureType::TextureCubeArray,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TextureType::Texture1D => "Texture1D",
            TextureType::Texture1DArray => "Texture1DArray",
            TextureType::Texture2D => "Texture2D",
            TextureType::Texture2DArray => "Texture2DArray",
            TextureType::Texture2DMs => "Texture2DMS",
            TextureType::Texture2DMsArray => "Texture2DMSArray",
            TextureType::Texture3D => "Texture3D",
            TextureType::TextureCube => "TextureCube",
            TextureType::TextureCubeArray => "TextureCubeArray",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BufferType {
    Buffer,
    StructuredBuffer,
    ByteAddressBuffer,
}

impl BufferType {
    pub const ALL: [BufferType; 3] = [
        BufferType::Buffer,
        BufferType::StructuredBuffer,
        BufferType::ByteAddressBuffer,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BufferType::Buffer => "Buffer",
            BufferType::StructuredBuffer => "StructuredBuffer",
            BufferType::ByteAddressBuffer => "ByteAddressBuffer",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UavBufferType {
    RwBuffer,
    RwStructuredBuffer,
    RwByteAddressBuffer,
    AppendStructuredBuffer,
    ConsumeStructuredBuffer,
}

impl UavBufferType {
    pub const ALL: [UavBufferType; 5] = [
        UavBufferType::RwBuffer,
        UavBufferType::RwStructuredBuffer,
        UavBufferType::RwByteAddressBuffer,
        UavBufferType::AppendStructuredBuffer,
        UavBufferType::ConsumeStructuredBuffer,
    ];

    pub fn name(self) -> &'static str {
        match self {
            UavBufferType::RwBuffer => "RWBuffer",
            UavBufferType::RwStructuredBuffer => "RWStructuredBuffer",
            UavBufferType::RwByteAddressBuffer => "RWByteAddressBuffer",
            UavBufferType::AppendStructuredBuffer => "AppendStructuredBuffer",
            UavBufferType::ConsumeStructuredBuffer => "ConsumeStructuredBuffer",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UavTextureType {
    RwTexture1D,
    RwTexture1DArray,
    RwTexture2D,
    RwTexture2DArray,
    RwTexture3D,
}

impl UavTextureType {
    pub const ALL: [UavTextureType; 5] = [
        UavTextureType::RwTexture1D,
        UavTextureType::RwTexture1DArray,
        UavTextureType::RwTexture2D,
        UavTextureType::RwTexture2DArray,
        UavTextureType::RwTexture3D,
    ];

    pub fn name(self) -> &'static str {
        match self {
            UavTextureType::RwTexture1D => "RWTexture1D",
            UavTextureType::RwTexture1DArray => "RWTexture1DArray",
            UavTextureType::RwTexture2D => "RWTexture2D",
            UavTextureType::RwTexture2DArray => "RWTexture2DArray",
            UavTextureType::RwTexture3D => "RWTexture3D",
        }
    }
}

/// A shader value type.
///
/// Equality and hashing are structural over the active variant and its payload.
/// The optional semantic on scalar/vector/matrix types (e.g. `SV_POSITION`) is
/// carried along for struct field emission but never takes part in comparisons.
#[derive(Clone, Debug)]
pub enum SType {
    Scalar {
        scalar: ScalarType,
        semantic: Option<String>,
    },
    Vector {
        scalar: ScalarType,
        len: u8,
        semantic: Option<String>,
    },
    Matrix {
        scalar: ScalarType,
        rows: u8,
        cols: u8,
        semantic: Option<String>,
    },
    Sampler(SamplerType),
    Texture(TextureType),
    Buffer(BufferType),
    UavBuffer(UavBufferType),
    UavTexture(UavTextureType),
    Struct(String),
}

impl SType {
    pub fn scalar(scalar: ScalarType) -> Self {
        SType::Scalar {
            scalar,
            semantic: None,
        }
    }

    pub fn vector(scalar: ScalarType, len: u8) -> Self {
        SType::Vector {
            scalar,
            len,
            semantic: None,
        }
    }

    pub fn matrix(scalar: ScalarType, rows: u8, cols: u8) -> Self {
        SType::Matrix {
            scalar,
            rows,
            cols,
            semantic: None,
        }
    }

    pub fn structure(name: impl Into<String>) -> Self {
        SType::Struct(name.into())
    }

    pub fn unknown() -> Self {
        SType::scalar(ScalarType::Unknown)
    }

    pub fn float() -> Self {
        SType::scalar(ScalarType::Float)
    }

    /// `float` for one component, `floatN` otherwise.
    pub fn float_n(components: u8) -> Self {
        if components <= 1 {
            SType::float()
        } else {
            SType::vector(ScalarType::Float, components)
        }
    }

    /// Attach a semantic to a scalar/vector/matrix type. Other variants are returned unchanged.
    pub fn with_semantic(self, semantic: impl Into<String>) -> Self {
        let semantic = Some(semantic.into());
        match self {
            SType::Scalar { scalar, .. } => SType::Scalar { scalar, semantic },
            SType::Vector { scalar, len, .. } => SType::Vector {
                scalar,
                len,
                semantic,
            },
            SType::Matrix {
                scalar, rows, cols, ..
            } => SType::Matrix {
                scalar,
                rows,
                cols,
                semantic,
            },
            other => other,
        }
    }

    pub fn semantic(&self) -> Option<&str> {
        match self {
            SType::Scalar { semantic, .. }
            | SType::Vector { semantic, .. }
            | SType::Matrix { semantic, .. } => semantic.as_deref(),
            _ => None,
        }
    }

    /// Same type with any semantic stripped.
    pub fn without_semantic(&self) -> Self {
        match self {
            SType::Scalar { scalar, .. } => SType::scalar(*scalar),
            SType::Vector { scalar, len, .. } => SType::vector(*scalar, *len),
            SType::Matrix {
                scalar, rows, cols, ..
            } => SType::matrix(*scalar, *rows, *cols),
            other => other.clone(),
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, SType::Scalar { .. })
    }

    pub fn is_vector(&self) -> bool {
        matches!(self, SType::Vector { .. })
    }

    pub fn is_matrix(&self) -> bool {
        matches!(self, SType::Matrix { .. })
    }

    pub fn is_struct(&self) -> bool {
        matches!(self, SType::Struct(_))
    }

    pub fn is_unknown(&self) -> bool {
        matches!(
            self,
            SType::Scalar {
                scalar: ScalarType::Unknown,
                ..
            }
        )
    }

    /// True for samplers, textures and (UAV) buffers.
    pub fn is_resource(&self) -> bool {
        matches!(
            self,
            SType::Sampler(_)
                | SType::Texture(_)
                | SType::Buffer(_)
                | SType::UavBuffer(_)
                | SType::UavTexture(_)
        )
    }

    /// Component count of a scalar or vector type.
    pub fn components(&self) -> Option<u8> {
        match self {
            SType::Scalar { .. } => Some(1),
            SType::Vector { len, .. } => Some(*len),
            _ => None,
        }
    }

    /// Element scalar type of a scalar/vector/matrix type.
    pub fn element(&self) -> Option<ScalarType> {
        match self {
            SType::Scalar { scalar, .. }
            | SType::Vector { scalar, .. }
            | SType::Matrix { scalar, .. } => Some(*scalar),
            _ => None,
        }
    }

    /// The keyword (or struct name) this type is spelled as in shader source.
    pub fn name(&self) -> String {
        match self {
            SType::Scalar { scalar, .. } => scalar.name().to_string(),
            SType::Vector { scalar, len, .. } => format!("{}{}", scalar.name(), len),
            SType::Matrix {
                scalar, rows, cols, ..
            } => format!("{}{}x{}", scalar.name(), rows, cols),
            SType::Sampler(t) => t.name().to_string(),
            SType::Texture(t) => t.name().to_string(),
            SType::Buffer(t) => t.name().to_string(),
            SType::UavBuffer(t) => t.name().to_string(),
            SType::UavTexture(t) => t.name().to_string(),
            SType::Struct(name) => name.clone(),
        }
    }

    /// C-style cast prefix, e.g. `(float3)`.
    ///
    /// Only scalar/vector/matrix/struct types can be cast to; anything else is an
    /// authoring error and yields [`GeneratorError::InvalidCast`].
    pub fn cast_to(&self) -> Result<String, GeneratorError> {
        if self.is_resource() || self.is_unknown() {
            return Err(GeneratorError::InvalidCast { ty: self.name() });
        }
        Ok(format!("({})", self.name()))
    }

    /// Cast prefix converting `from` into `to`, empty when the types already match.
    pub fn from_cast_to(from: &SType, to: &SType) -> Result<String, GeneratorError> {
        if from.is_resource() {
            return Err(GeneratorError::InvalidCast { ty: from.name() });
        }
        if from == to {
            return Ok(String::new());
        }
        to.cast_to()
    }

    /// Whether a component-wise operator over `a` and `b` needs explicit casts:
    /// both operands are non-scalar and their types differ.
    pub fn need_cast_per_component_math(a: &SType, b: &SType) -> bool {
        a != b && !a.is_scalar() && !b.is_scalar()
    }
}

impl PartialEq for SType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (SType::Scalar { scalar: a, .. }, SType::Scalar { scalar: b, .. }) => a == b,
            (
                SType::Vector {
                    scalar: a, len: la, ..
                },
                SType::Vector {
                    scalar: b, len: lb, ..
                },
            ) => a == b && la == lb,
            (
                SType::Matrix {
                    scalar: a,
                    rows: ra,
                    cols: ca,
                    ..
                },
                SType::Matrix {
                    scalar: b,
                    rows: rb,
                    cols: cb,
                    ..
                },
            ) => a == b && ra == rb && ca == cb,
            (SType::Sampler(a), SType::Sampler(b)) => a == b,
            (SType::Texture(a), SType::Texture(b)) => a == b,
            (SType::Buffer(a), SType::Buffer(b)) => a == b,
            (SType::UavBuffer(a), SType::UavBuffer(b)) => a == b,
            (SType::UavTexture(a), SType::UavTexture(b)) => a == b,
            (SType::Struct(a), SType::Struct(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for SType {}

impl Hash for SType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            SType::Scalar { scalar, .. } => scalar.hash(state),
            SType::Vector { scalar, len, .. } => {
                scalar.hash(state);
                len.hash(state);
            }
            SType::Matrix {
                scalar, rows, cols, ..
            } => {
                scalar.hash(state);
                rows.hash(state);
                cols.hash(state);
            }
            SType::Sampler(t) => t.hash(state),
            SType::Texture(t) => t.hash(state),
            SType::Buffer(t) => t.hash(state),
            SType::UavBuffer(t) => t.hash(state),
            SType::UavTexture(t) => t.hash(state),
            SType::Struct(name) => name.hash(state),
        }
    }
}

impl fmt::Display for SType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Lookup table from lower-cased type keywords to [`SType`] values.
///
/// Built once per generator and handed in explicitly; there is no global instance.
#[derive(Clone, Debug)]
pub struct TypeRegistry {
    types: HashMap<String, SType>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// Registry pre-populated with every scalar, vector, matrix and resource keyword.
    pub fn new() -> Self {
        let mut registry = Self {
            types: HashMap::new(),
        };
        for scalar in ScalarType::ALL {
            registry.register(SType::scalar(scalar));
            for len in 2..=4 {
                registry.register(SType::vector(scalar, len));
            }
            for rows in 1..=4 {
                for cols in 1..=4 {
                    registry.register(SType::matrix(scalar, rows, cols));
                }
            }
        }
        for t in SamplerType::ALL {
            registry.register(SType::Sampler(t));
        }
        for t in TextureType::ALL {
            registry.register(SType::Texture(t));
        }
        for t in BufferType::ALL {
            registry.register(SType::Buffer(t));
        }
        for t in UavBufferType::ALL {
            registry.register(SType::UavBuffer(t));
        }
        for t in UavTextureType::ALL {
            registry.register(SType::UavTexture(t));
        }
        registry
    }

    /// Register an extra type under its (lower-cased) name.
    pub fn register(&mut self, ty: SType) {
        self.types.insert(ty.name().to_ascii_lowercase(), ty);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(&name.to_ascii_lowercase())
    }

    /// Source spellings of every registered type.
    pub fn type_names(&self) -> impl Iterator<Item = String> + '_ {
        self.types.values().map(SType::name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Parse a type keyword. Never fails: unrecognized names become struct references,
    /// which allows forward references to structs that are declared later.
    pub fn parse(&self, name: &str) -> SType {
        let name = name.trim();
        match self.types.get(&name.to_ascii_lowercase()) {
            Some(ty) => ty.clone(),
            None => SType::Struct(name.to_string()),
        }
    }
}
