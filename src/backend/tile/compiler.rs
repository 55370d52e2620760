use log::info;

use crate::{
    backend::{
        tile::generator::{TileGenerator, TileOptions},
        KernelCompiler,
    },
    error::TileResult,
    kernel::{Kernel, TensorSignature},
};

/// Generated Tile source plus the signatures of its parameters and result.
#[derive(Debug, Clone, PartialEq)]
pub struct TileFunction {
    pub source: String,
    pub inputs: Vec<TensorSignature>,
    pub output: Option<TensorSignature>,
}

/// Compiles kernels to Tile source text.
///
/// # Examples
///
/// ```
/// use tilegen::backend::{tile::TileCompiler, KernelCompiler};
/// use tilegen::kernel::Kernel;
/// use tilegen::notation::Session;
///
/// let session = Session::new();
/// let [v1, v2, v3] = session.vector("V1", 16).siblings::<3>();
/// v3.define_elementwise(v1 + v2).unwrap();
///
/// let mut compiler = TileCompiler::new();
/// let function = compiler.compile(&Kernel::new(v3).unwrap()).unwrap();
/// assert_eq!(function.source, "function(V1, V2) -> (V3) { V3 = V1 + V2; }");
/// ```
#[derive(Debug, Clone, Default)]
pub struct TileCompiler {
    options: TileOptions,
}

impl KernelCompiler for TileCompiler {
    type Output = TileFunction;
    type Option = TileOptions;

    fn new() -> Self {
        TileCompiler::default()
    }

    fn with_option(&mut self, option: Self::Option) {
        self.options = option;
    }

    fn compile(&mut self, kernel: &Kernel<'_>) -> TileResult<TileFunction> {
        let mut generator = TileGenerator::with_options(kernel.tree(), self.options.clone());
        let source = generator.generate()?.to_string();
        let inputs = generator
            .parameters()
            .iter()
            .map(|label| kernel.signature(label))
            .collect::<TileResult<Vec<_>>>()?;
        let output = generator
            .return_binding()
            .map(|label| kernel.signature(&label))
            .transpose()?;
        info!(
            "compiled Tile kernel for {} with {} parameter(s)",
            kernel.output_tensor().name(),
            inputs.len()
        );
        Ok(TileFunction {
            source,
            inputs,
            output,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::DType;
    use crate::notation::Session;
    use crate::shape;

    fn setup_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_compile_signatures() {
        setup_logger();
        let session = Session::new();
        let [a, b, c] = session.matrix("A", 3, 3).siblings::<3>();
        let (i, j) = session.index_set("a", shape![3, 3]).split::<2>().unwrap();
        c.define(&[i, j], a.at(&[i, j]).unwrap() * b.at(&[j, i]).unwrap())
            .unwrap();

        let kernel = Kernel::of::<i32>(c).unwrap();
        let function = TileCompiler::new().compile(&kernel).unwrap();
        assert_eq!(
            function.source,
            "function(A, B) -> (C) { C[a, b] = A[a, b:AN] * B[b, a:BN]; }"
        );
        let labels: Vec<_> = function.inputs.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["A", "B"]);
        assert_eq!(function.output.unwrap().dtype, DType::I32);
    }

    #[test]
    fn test_with_option() {
        let session = Session::new();
        let [d, e, f] = session.vector("D", 4).siblings::<3>();
        let out = session.vector("Out", 4);
        e.define_elementwise(d * 2.0f32).unwrap();
        out.define_elementwise(e + f).unwrap();

        let mut compiler = TileCompiler::new();
        compiler.with_option(TileOptions::builder().separator("\n").build());
        let function = compiler.compile(&Kernel::new(out).unwrap()).unwrap();
        assert_eq!(
            function.source,
            "function(D, F) -> (OUT) { E = D * 2.0;\nOUT = E + F; }"
        );
    }
}
