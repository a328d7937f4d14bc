//! Reserved words and intrinsic names that generated identifiers must never reuse.

use super::types::TypeRegistry;

/// Language keywords, object types and C++ reserved words.
pub const KEYWORDS: &[&str] = &[
    "AppendStructuredBuffer",
    "asm",
    "asm_fragment",
    "BlendState",
    "bool",
    "break",
    "Buffer",
    "ByteAddressBuffer",
    "case",
    "cbuffer",
    "centroid",
    "class",
    "column_major",
    "compile",
    "compile_fragment",
    "CompileShader",
    "const",
    "continue",
    "ComputeShader",
    "ConsumeStructuredBuffer",
    "default",
    "DepthStencilState",
    "DepthStencilView",
    "discard",
    "do",
    "double",
    "DomainShader",
    "dword",
    "else",
    "export",
    "extern",
    "false",
    "float",
    "for",
    "fxgroup",
    "GeometryShader",
    "groupshared",
    "half",
    "Hullshader",
    "if",
    "in",
    "inline",
    "inout",
    "InputPatch",
    "int",
    "interface",
    "line",
    "lineadj",
    "linear",
    "LineStream",
    "matrix",
    "min16float",
    "min10float",
    "min16int",
    "min12int",
    "min16uint",
    "namespace",
    "nointerpolation",
    "noperspective",
    "NULL",
    "out",
    "OutputPatch",
    "packoffset",
    "pass",
    "pixelfragment",
    "PixelShader",
    "point",
    "PointStream",
    "precise",
    "RasterizerState",
    "RenderTargetView",
    "return",
    "register",
    "row_major",
    "RWBuffer",
    "RWByteAddressBuffer",
    "RWStructuredBuffer",
    "RWTexture1D",
    "RWTexture1DArray",
    "RWTexture2D",
    "RWTexture2DArray",
    "RWTexture3D",
    "sample",
    "linearSampler",
    "SamplerState",
    "SamplerComparisonState",
    "shared",
    "snorm",
    "stateblock",
    "stateblock_state",
    "static",
    "string",
    "struct",
    "switch",
    "StructuredBuffer",
    "tbuffer",
    "technique",
    "technique10",
    "technique11",
    "texture",
    "Texture1D",
    "Texture1DArray",
    "Texture2D",
    "Texture2DArray",
    "Texture2DMS",
    "Texture2DMSArray",
    "Texture3D",
    "TextureCube",
    "TextureCubeArray",
    "true",
    "typedef",
    "triangle",
    "triangleadj",
    "TriangleStream",
    "uint",
    "uniform",
    "unorm",
    "unsigned",
    "vector",
    "vertexfragment",
    "VertexShader",
    "void",
    "volatile",
    "while",
    // C++ reserved words the compiler front end rejects as identifiers.
    "auto",
    "catch",
    "char",
    "const_cast",
    "delete",
    "dynamic_cast",
    "enum",
    "explicit",
    "friend",
    "goto",
    "long",
    "mutable",
    "new",
    "operator",
    "private",
    "protected",
    "public",
    "reinterpret_cast",
    "short",
    "signed",
    "sizeof",
    "static_cast",
    "template",
    "this",
    "throw",
    "try",
    "typename",
    "union",
    "using",
    "virtual",
];

/// Intrinsic functions.
pub const INTRINSICS: &[&str] = &[
    "abs",
    "acos",
    "all",
    "any",
    "asdouble",
    "asfloat",
    "asin",
    "asint",
    "asuint",
    "atan",
    "atan2",
    "ceil",
    "clamp",
    "clip",
    "cos",
    "cosh",
    "cross",
    "ddx",
    "ddx_coarse",
    "ddx_fine",
    "ddy",
    "ddy_coarse",
    "ddy_fine",
    "degrees",
    "distance",
    "dot",
    "exp",
    "exp2",
    "floor",
    "fmod",
    "frac",
    "fwidth",
    "ldexp",
    "length",
    "lerp",
    "lit",
    "log",
    "log10",
    "log2",
    "max",
    "min",
    "mul",
    "normalize",
    "pow",
    "radians",
    "rcp",
    "reflect",
    "refract",
    "round",
    "rsqrt",
    "saturate",
    "sign",
    "sin",
    "sinh",
    "smoothstep",
    "sqrt",
    "step",
    "tan",
    "tanh",
    "trunc",
];

/// Minimum-precision scalar names; their vector and matrix forms are reserved too.
const MIN_PRECISION_SCALARS: &[&str] = &["min10float", "min16float", "min12int", "min16int", "min16uint"];

/// The full set of names seeded into the variable table before a compilation.
#[derive(Clone, Debug)]
pub struct KeywordSet {
    names: Vec<String>,
}

impl Default for KeywordSet {
    fn default() -> Self {
        Self::hlsl(&TypeRegistry::new())
    }
}

impl KeywordSet {
    /// Keywords, intrinsics, every type keyword known to `registry`, and the
    /// minimum-precision vector/matrix spellings.
    pub fn hlsl(registry: &TypeRegistry) -> Self {
        let mut names: Vec<String> = KEYWORDS
            .iter()
            .chain(INTRINSICS.iter())
            .map(|s| s.to_string())
            .collect();

        names.extend(registry.type_names());

        for base in MIN_PRECISION_SCALARS {
            for len in 2..=4 {
                names.push(format!("{base}{len}"));
            }
            for rows in 1..=4 {
                for cols in 1..=4 {
                    names.push(format!("{base}{rows}x{cols}"));
                }
            }
        }

        Self { names }
    }

    pub fn empty() -> Self {
        Self { names: Vec::new() }
    }

    pub fn insert(&mut self, name: impl Into<String>) {
        self.names.push(name.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
