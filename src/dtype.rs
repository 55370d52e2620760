use std::fmt;

/// Element type of a kernel's tensors.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum DType {
    Bool,
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    #[default]
    F32,
    F64,
}

impl DType {
    pub fn is_float(&self) -> bool {
        matches!(self, DType::F32 | DType::F64)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            DType::Bool => "boolean",
            DType::U8 => "uint8",
            DType::U16 => "uint16",
            DType::U32 => "uint32",
            DType::U64 => "uint64",
            DType::I8 => "int8",
            DType::I16 => "int16",
            DType::I32 => "int32",
            DType::I64 => "int64",
            DType::F32 => "float32",
            DType::F64 => "float64",
        };
        write!(f, "{name}")
    }
}

/// A typed literal appearing in a tensor expression.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Const {
    Bool(bool),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
}

impl Const {
    pub fn dtype(&self) -> DType {
        match *self {
            Const::Bool(_) => DType::Bool,
            Const::U8(_) => DType::U8,
            Const::U16(_) => DType::U16,
            Const::U32(_) => DType::U32,
            Const::U64(_) => DType::U64,
            Const::I8(_) => DType::I8,
            Const::I16(_) => DType::I16,
            Const::I32(_) => DType::I32,
            Const::I64(_) => DType::I64,
            Const::F32(_) => DType::F32,
            Const::F64(_) => DType::F64,
        }
    }
}

impl fmt::Display for Const {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Const::Bool(v) => write!(f, "{}", if v { 1 } else { 0 }),
            Const::U8(v) => write!(f, "{v}"),
            Const::U16(v) => write!(f, "{v}"),
            Const::U32(v) => write!(f, "{v}"),
            Const::U64(v) => write!(f, "{v}"),
            Const::I8(v) => write!(f, "{v}"),
            Const::I16(v) => write!(f, "{v}"),
            Const::I32(v) => write!(f, "{v}"),
            Const::I64(v) => write!(f, "{v}"),
            Const::F32(v) => write_float(f, v as f64),
            Const::F64(v) => write_float(f, v),
        }
    }
}

// Floats always carry a decimal point so the kernel language does not read them as integers.
fn write_float(f: &mut fmt::Formatter, v: f64) -> fmt::Result {
    let s = format!("{v}");
    if s.contains('.') || s.contains('e') || s.contains("inf") || s.contains("NaN") {
        write!(f, "{s}")
    } else {
        write!(f, "{s}.0")
    }
}

/// Maps a Rust scalar type to its [`DType`].
pub trait Element: Copy + 'static {
    const DTYPE: DType;
}

macro_rules! impl_dtype {
    ($variant: ident, $num_type: ident) => {
        impl From<$num_type> for Const {
            fn from(v: $num_type) -> Self {
                Const::$variant(v)
            }
        }

        impl Element for $num_type {
            const DTYPE: DType = DType::$variant;
        }
    };
}

impl_dtype!(Bool, bool);
impl_dtype!(U8, u8);
impl_dtype!(U16, u16);
impl_dtype!(U32, u32);
impl_dtype!(U64, u64);
impl_dtype!(I8, i8);
impl_dtype!(I16, i16);
impl_dtype!(I32, i32);
impl_dtype!(I64, i64);
impl_dtype!(F32, f32);
impl_dtype!(F64, f64);
