use rstest::rstest;
use tilegen::backend::tile::TileGenerator;
use tilegen::prelude::*;
use tilegen::tree::{TensorOp, TreeBuilder};

fn setup_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn compile(kernel: &Kernel<'_>) -> TileResult<TileFunction> {
    TileCompiler::new().compile(kernel)
}

#[test]
fn test_transpose_product() {
    setup_logger();
    let session = Session::new();
    let [a, b, c] = session.matrix("A", 4, 4).siblings::<3>();
    let (i, j) = session.index_set("a", shape![4, 4]).split::<2>().unwrap();
    c.define(&[i, j], a.at(&[i, j]).unwrap() * b.at(&[j, i]).unwrap())
        .unwrap();

    let function = compile(&Kernel::new(c).unwrap()).unwrap();
    assert_eq!(
        function.source,
        "function(A, B) -> (C) { C[a, b] = A[a, b:AN] * B[b, a:BN]; }"
    );
    let inputs: Vec<_> = function.inputs.iter().map(|s| s.label.as_str()).collect();
    assert_eq!(inputs, vec!["A", "B"]);
    assert_eq!(function.output.unwrap().shape, shape![4, 4]);
}

#[test]
fn test_redefinition_does_not_change_source() {
    let session = Session::new();
    let [a, b, c] = session.matrix("A", 4, 4).siblings::<3>();
    let (i, j) = session.index_set("a", shape![4, 4]).split::<2>().unwrap();
    c.define(&[i, j], a.at(&[i, j]).unwrap() * b.at(&[j, i]).unwrap())
        .unwrap();
    assert!(matches!(
        c.define(&[i, j], a.at(&[i, j]).unwrap() + b.at(&[i, j]).unwrap()),
        Err(TileError::AlreadyDefined { .. })
    ));

    let function = compile(&Kernel::new(c).unwrap()).unwrap();
    assert!(function.source.contains("A[a, b:AN] * B[b, a:BN]"));
}

#[test]
fn test_elementwise_sum() {
    setup_logger();
    let session = Session::new();
    let [v1, v2, v3] = session.vector("V1", 16).siblings::<3>();
    v3.define_elementwise(v1 + v2).unwrap();

    let kernel = Kernel::new(v3).unwrap();
    let mut generator = TileGenerator::new(kernel.tree());
    let source = generator.generate().unwrap().to_string();
    assert_eq!(source, "function(V1, V2) -> (V3) { V3 = V1 + V2; }");
    assert_eq!(generator.text(), Some("V3"));
    assert_eq!(generator.statements().collect::<Vec<_>>(), vec!["V3 = V1 + V2;"]);
    assert!(generator.success());
}

#[test]
fn test_matrix_product() {
    let session = Session::new();
    let [a, b, c] = session.matrix("A", 4, 4).siblings::<3>();
    let (i, j, k) = session.index_set("i", shape![4, 4, 4]).split::<3>().unwrap();
    c.define(&[i, j], a.at(&[i, k]).unwrap() * b.at(&[k, j]).unwrap())
        .unwrap();

    let function = compile(&Kernel::new(c).unwrap()).unwrap();
    assert_eq!(
        function.source,
        "function(A, B) -> (C) { C[i, j] = +(A[i, k:AN] * B[k, j:BN]); }"
    );
}

#[test]
fn test_summation_skips_bias_term() {
    let session = Session::new();
    let a = session.matrix("A", 4, 4);
    let [b, c, d] = session.vector("B", 4).siblings::<3>();
    let (i, j) = session.index_set("i", shape![4, 4]).split::<2>().unwrap();
    c.define(
        &[i],
        a.at(&[i, j]).unwrap() * b.at(&[j]).unwrap() + d.at(&[i]).unwrap(),
    )
    .unwrap();

    let function = compile(&Kernel::new(c).unwrap()).unwrap();
    assert_eq!(
        function.source,
        "function(A, B, D) -> (C) { C[i] = +(A[i, j:AN] * B[j:BN]) + D[i:DN]; }"
    );
}

#[rstest]
#[case::max("max", "C[i] = >(A[i, j:AN]);")]
#[case::min("min", "C[i] = <(A[i, j:AN]);")]
#[case::product("prod", "C[i] = *(A[i, j:AN]);")]
#[case::sum("sum", "C[i] = +(A[i, j:AN]);")]
fn test_explicit_aggregations(#[case] name: &str, #[case] statement: &str) {
    let session = Session::new();
    let a = session.matrix("A", 4, 4);
    let c = session.vector("C", 4);
    let (i, j) = session.index_set("i", shape![4, 4]).split::<2>().unwrap();
    let rhs = session.call(name, vec![a.at(&[i, j]).unwrap()]);
    c.define(&[i], rhs).unwrap();

    let function = compile(&Kernel::new(c).unwrap()).unwrap();
    assert_eq!(function.source, format!("function(A) -> (C) {{ {statement} }}"));
}

#[test]
fn test_scalar_reduction() {
    let session = Session::new();
    let v = session.vector("V", 8);
    let s = session.scalar("S");
    let [i] = session.index_set("i", shape![8]).take::<1>().unwrap();
    s.define(&[], v.at(&[i]).unwrap()).unwrap();

    let function = compile(&Kernel::new(s).unwrap()).unwrap();
    assert_eq!(function.source, "function(V) -> (S) { S = +(V[i:VN]); }");
    assert_eq!(function.output.unwrap().rank(), 0);
}

#[test]
fn test_shifted_index() {
    let session = Session::new();
    let [a, c] = session.vector("A", 8).siblings::<2>();
    let [i] = session.index_set("i", shape![8]).take::<1>().unwrap();
    c.define(&[i], a.at(&[i + 1]).unwrap()).unwrap();

    let function = compile(&Kernel::new(c).unwrap()).unwrap();
    assert_eq!(function.source, "function(A) -> (C) { C[i] = A[i + 1:AN]; }");
}

#[test]
fn test_intermediate_statement_comes_first() {
    setup_logger();
    let session = Session::new();
    let [v1, v2, v3] = session.vector("V1", 16).siblings::<3>();
    let t = session.vector("T", 16);
    t.define_elementwise(v1 * v2).unwrap();
    v3.define_elementwise(t + v1).unwrap();

    let function = compile(&Kernel::new(v3).unwrap()).unwrap();
    assert_eq!(
        function.source,
        "function(V1, V2) -> (V3) { T = V1 * V2; V3 = T + V1; }"
    );
}

fn grouped_product<'s>(a: Tensor<'s>, b: Tensor<'s>, c: Tensor<'s>) -> TensorExpr<'s> {
    (a * b) * c
}

fn sum_of_product<'s>(a: Tensor<'s>, b: Tensor<'s>, c: Tensor<'s>) -> TensorExpr<'s> {
    a * b + c
}

fn product_of_sum<'s>(a: Tensor<'s>, b: Tensor<'s>, c: Tensor<'s>) -> TensorExpr<'s> {
    (a + b) * c
}

fn difference_of_sum<'s>(a: Tensor<'s>, b: Tensor<'s>, c: Tensor<'s>) -> TensorExpr<'s> {
    a - (b + c)
}

fn sum_of_quotient<'s>(a: Tensor<'s>, b: Tensor<'s>, c: Tensor<'s>) -> TensorExpr<'s> {
    a + b / c
}

fn negated_sum<'s>(a: Tensor<'s>, b: Tensor<'s>, c: Tensor<'s>) -> TensorExpr<'s> {
    -(a + b) * c
}

#[rstest]
#[case(grouped_product, "(V1 * V2) * V3")]
#[case(sum_of_product, "V1 * V2 + V3")]
#[case(product_of_sum, "(V1 + V2) * V3")]
#[case(difference_of_sum, "V1 - (V2 + V3)")]
#[case(sum_of_quotient, "V1 + V2 / V3")]
#[case(negated_sum, "(-(V1 + V2)) * V3")]
fn test_parenthesization(
    #[case] build: for<'s> fn(Tensor<'s>, Tensor<'s>, Tensor<'s>) -> TensorExpr<'s>,
    #[case] expected: &str,
) {
    let session = Session::new();
    let [v1, v2, v3, out] = session.vector("V1", 16).siblings::<4>();
    out.define_elementwise(build(v1, v2, v3)).unwrap();

    let function = compile(&Kernel::new(out).unwrap()).unwrap();
    assert_eq!(
        function.source,
        format!("function(V1, V2, V3) -> (V4) {{ V4 = {expected}; }}")
    );
}

#[test]
fn test_unary_functions() {
    let session = Session::new();
    let [x, y] = session.vector("X", 16).siblings::<2>();
    y.define_elementwise(x.expr().square().exp() + x.expr().sqrt()).unwrap();

    let function = compile(&Kernel::new(y).unwrap()).unwrap();
    assert_eq!(
        function.source,
        "function(X) -> (Y) { Y = exp(X * X) + sqrt(X); }"
    );
}

#[test]
fn test_options() {
    let session = Session::new();
    let [a, b, c] = session.matrix("A", 4, 4).siblings::<3>();
    let (i, j) = session.index_set("a", shape![4, 4]).split::<2>().unwrap();
    c.define(&[i, j], a.at(&[i, j]).unwrap() * b.at(&[j, i]).unwrap())
        .unwrap();

    let mut compiler = TileCompiler::new();
    compiler.with_option(TileOptions::builder().dimension_suffix(false).build());
    let function = compiler.compile(&Kernel::new(c).unwrap()).unwrap();
    assert_eq!(
        function.source,
        "function(A, B) -> (C) { C[a, b] = A[a, b] * B[b, a]; }"
    );
}

#[test]
fn test_statement_separator() {
    let session = Session::new();
    let [v1, v2, v3] = session.vector("V1", 16).siblings::<3>();
    let t = session.vector("T", 16);
    t.define_elementwise(-v1).unwrap();
    v3.define_elementwise(t * v2).unwrap();

    let mut compiler = TileCompiler::new();
    compiler.with_option(TileOptions::builder().separator("\n").build());
    let function = compiler.compile(&Kernel::new(v3).unwrap()).unwrap();
    assert_eq!(
        function.source,
        "function(V1, V2) -> (V3) { T = -V1;\nV3 = T * V2; }"
    );
}

#[test]
fn test_unsupported_operator_is_reported() {
    let session = Session::new();
    let [a, b, c] = session.vector("A", 3).siblings::<3>();
    c.define_elementwise(a % b).unwrap();
    assert!(matches!(
        Kernel::new(c),
        Err(TileError::UnsupportedExpression { .. })
    ));
}

#[test]
fn test_malformed_tree_is_reported() {
    let mut b = TreeBuilder::new();
    let out = b.tensor("OUT");
    let a = b.tensor("A");
    let half = b.operator(TensorOp::Add, Some(a), None);
    let root = b.binary(TensorOp::ElementwiseAssign, out, half);
    let tree = b.build(root).unwrap();

    let mut generator = TileGenerator::new(&tree);
    assert!(matches!(
        generator.generate(),
        Err(TileError::MalformedTree { .. })
    ));
    assert!(!generator.success());
}

#[test]
fn test_names_differing_in_case_stay_distinct() {
    let session = Session::new();
    let lower = session.vector("a", 4);
    let upper = session.vector("A", 4);
    let c = session.vector("C", 4);
    c.define_elementwise(lower + upper).unwrap();
    assert_eq!(upper.name(), "A0");

    let function = compile(&Kernel::new(c).unwrap()).unwrap();
    assert_eq!(function.source, "function(A, A0) -> (C) { C = A + A0; }");
}

#[test]
fn test_cycle_through_output_is_reported() {
    let session = Session::new();
    let out = session.vector("Out", 4);
    let d = session.vector("D", 4);
    d.define_elementwise(out * 2.0).unwrap();
    out.define_elementwise(d + 1.0).unwrap();
    assert!(matches!(
        Kernel::new(out),
        Err(TileError::UnsupportedExpression { construct }) if construct.contains("cyclic")
    ));
}
