//! Integration tests for the visual script WASM code generator.
//!
//! Tests validate:
//! - Generated modules are valid and have the expected sections and exports
//! - Value nodes select the opcode family from their operand types
//! - Flow nodes chain, branch and sequence correctly
//! - Missing links and type mismatches degrade to diagnostics
//! - Generated entry points run under wasmi against stub host imports

use vscript_codegen::types::{op, HOST_IMPORTS, VAL_F32, VAL_I32, VAL_I64};
use vscript_codegen::{EmitContext, ModuleWriter, ENTRY_POINTS};
use vscript_graph::{CompareOp, Graph, NodeData, NodeId, ReflectedRef, ValueType};
use vscript_types::{ComponentHash, DiagnosticCode, Diagnostics, PropertyHash, StaticRegistry};
use wasmparser::{ExternalKind, Parser as WasmParser, Payload};

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

/// Assemble `graph` with the standard host interface.
fn build(graph: &Graph) -> (Vec<u8>, Diagnostics) {
    let mut writer = ModuleWriter::new();
    writer.add_function_import("LumixAPI", HOST_IMPORTS[0], None, &[VAL_I32, VAL_F32]);
    writer.add_function_import("LumixAPI", HOST_IMPORTS[1], None, &[VAL_I32, VAL_I64, VAL_F32]);
    writer.add_function_import("LumixAPI", HOST_IMPORTS[2], Some(VAL_F32), &[VAL_I32, VAL_I64]);
    for entry in &ENTRY_POINTS {
        if let Some(root) = graph.first_of_kind(entry.kind) {
            writer.add_function_export(entry.name, root, entry.params);
        }
    }
    writer.add_global(ValueType::I32, Some("self"));
    for var in graph.variables() {
        writer.add_global(var.ty, Some(&var.name));
    }
    let mut ctx = EmitContext::new(graph);
    let mut wasm = Vec::new();
    writer.write(&mut wasm, &mut ctx);
    (wasm, ctx.into_diagnostics())
}

fn get_exports(wasm: &[u8]) -> Vec<(String, ExternalKind)> {
    let mut exports = Vec::new();
    for payload in WasmParser::new(0).parse_all(wasm) {
        if let Ok(Payload::ExportSection(reader)) = payload {
            for export in reader {
                let exp = export.expect("valid export");
                exports.push((exp.name.to_string(), exp.kind));
            }
        }
    }
    exports
}

/// Raw function bodies, locals declaration included.
fn get_bodies(wasm: &[u8]) -> Vec<Vec<u8>> {
    let mut bodies = Vec::new();
    for payload in WasmParser::new(0).parse_all(wasm) {
        if let Ok(Payload::CodeSectionEntry(body)) = payload {
            bodies.push(wasm[body.range()].to_vec());
        }
    }
    bodies
}

/// `update` entry whose flow output leads to `first`.
fn with_update(g: &mut Graph, first: NodeId) -> NodeId {
    let update = g.add_node(NodeData::Update).unwrap();
    g.connect(update, 0, first, 0);
    update
}

fn registry() -> StaticRegistry {
    StaticRegistry::new().with_component("physics", &["mass"])
}

fn bound_property() -> ReflectedRef {
    let mut r = ReflectedRef::unbound(ComponentHash::of("physics"), "mass");
    r.bind_property(&registry()).unwrap();
    r
}

// ══════════════════════════════════════════════════════════════════════════════
// Module structure
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_update_only_module() {
    let g = Graph::new_script();
    let (wasm, diags) = build(&g);
    wasmparser::validate(&wasm).expect("module should validate");
    assert!(diags.is_empty());

    let exports = get_exports(&wasm);
    let funcs: Vec<_> = exports
        .iter()
        .filter(|(_, k)| *k == ExternalKind::Func)
        .collect();
    assert_eq!(funcs.len(), 1);
    assert_eq!(funcs[0].0, "update");
    assert_eq!(get_bodies(&wasm), vec![vec![0x00, op::END]]);
}

#[test]
fn test_section_order() {
    let (wasm, _) = build(&Graph::new_script());
    let mut ids = Vec::new();
    for payload in WasmParser::new(0).parse_all(&wasm) {
        match payload {
            Ok(Payload::TypeSection(_)) => ids.push(1),
            Ok(Payload::ImportSection(_)) => ids.push(2),
            Ok(Payload::FunctionSection(_)) => ids.push(3),
            Ok(Payload::GlobalSection(_)) => ids.push(6),
            Ok(Payload::ExportSection(_)) => ids.push(7),
            Ok(Payload::CodeSectionStart { .. }) => ids.push(10),
            _ => {}
        }
    }
    assert_eq!(ids, vec![1, 2, 3, 6, 7, 10]);
}

#[test]
fn test_exports_follow_entry_order_and_skip_missing() {
    let mut g = Graph::new();
    g.add_node(NodeData::Start).unwrap();
    g.add_node(NodeData::KeyInput).unwrap();
    g.add_node(NodeData::Update).unwrap();
    g.add_variable("health", ValueType::Float);
    g.add_variable("", ValueType::I32);
    g.add_variable("health", ValueType::I32);
    let (wasm, _) = build(&g);
    wasmparser::validate(&wasm).expect("module should validate");

    let names: Vec<_> = get_exports(&wasm).into_iter().map(|(n, _)| n).collect();
    assert_eq!(
        names,
        vec!["update", "onKeyEvent", "start", "self", "health"]
    );
}

#[test]
fn test_imports_are_positional() {
    let (wasm, _) = build(&Graph::new());
    let mut fields = Vec::new();
    for payload in WasmParser::new(0).parse_all(&wasm) {
        if let Ok(Payload::ImportSection(reader)) = payload {
            for import in reader {
                let import = import.expect("valid import");
                assert_eq!(import.module, "LumixAPI");
                fields.push(import.name.to_string());
            }
        }
    }
    assert_eq!(fields, HOST_IMPORTS);
}

// ══════════════════════════════════════════════════════════════════════════════
// Emission
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_constant_through_sequence() {
    let mut g = Graph::new();
    let seq = g.add_node(NodeData::Sequence).unwrap();
    let c = g.add_node(NodeData::Const { value: 2.5 }).unwrap();
    g.connect(seq, 0, c, 0);
    with_update(&mut g, seq);

    let (wasm, _) = build(&g);
    let body = &get_bodies(&wasm)[0];
    let mut expected = vec![0x00, op::F32_CONST];
    expected.extend_from_slice(&2.5f32.to_le_bytes());
    expected.push(op::END);
    assert_eq!(body, &expected);
}

#[test]
fn test_sequence_stops_at_first_gap() {
    let mut g = Graph::new();
    let seq = g.add_node(NodeData::Sequence).unwrap();
    let a = g.add_node(NodeData::Const { value: 1.0 }).unwrap();
    let b = g.add_node(NodeData::Const { value: 2.0 }).unwrap();
    let c = g.add_node(NodeData::Const { value: 3.0 }).unwrap();
    g.connect(seq, 0, a, 0);
    g.connect(seq, 1, b, 0);
    g.connect(seq, 3, c, 0);
    with_update(&mut g, seq);

    let (wasm, _) = build(&g);
    let body = &get_bodies(&wasm)[0];
    assert_eq!(body.len(), 1 + 5 + 5 + 1);
    assert_eq!(&body[2..6], &1.0f32.to_le_bytes());
    assert_eq!(&body[7..11], &2.0f32.to_le_bytes());
}

#[test]
fn test_set_variable_from_event_parameter() {
    let mut g = Graph::new();
    g.add_variable("dt", ValueType::Float);
    let set = g.add_node(NodeData::SetVariable { var: 0 }).unwrap();
    let update = with_update(&mut g, set);
    g.connect(update, 1, set, 1);

    let (wasm, diags) = build(&g);
    wasmparser::validate(&wasm).expect("module should validate");
    assert!(diags.is_empty());
    assert_eq!(
        get_bodies(&wasm)[0],
        vec![0x00, op::LOCAL_GET, 0, op::GLOBAL_SET, 1, op::END]
    );
}

#[test]
fn test_float_and_integer_families() {
    for (lhs, expected) in [
        (NodeData::Const { value: 1.0 }, op::F32_GE),
        (NodeData::SelfRef, op::I32_GE_S),
    ] {
        let mut g = Graph::new();
        let a = g.add_node(lhs.clone()).unwrap();
        let b = g.add_node(lhs).unwrap();
        let cmp = g.add_node(NodeData::Compare(CompareOp::Gte)).unwrap();
        g.connect(a, 0, cmp, 0);
        g.connect(b, 0, cmp, 1);
        let mut ctx = EmitContext::new(&g);
        let mut buf = Vec::new();
        vscript_codegen::emit_node(&mut ctx, &mut buf, cmp, 0);
        assert_eq!(*buf.last().unwrap(), expected);
        assert!(ctx.diagnostics.is_empty());
    }
}

#[test]
fn test_type_mismatch_still_emits_left_family() {
    let mut g = Graph::new();
    let f = g.add_node(NodeData::Const { value: 1.0 }).unwrap();
    let e = g.add_node(NodeData::SelfRef).unwrap();
    let add = g.add_node(NodeData::Add).unwrap();
    g.connect(f, 0, add, 0);
    g.connect(e, 0, add, 1);
    let mut ctx = EmitContext::new(&g);
    let mut buf = Vec::new();
    vscript_codegen::emit_node(&mut ctx, &mut buf, add, 0);

    assert_eq!(*buf.last().unwrap(), op::F32_ADD);
    let d = ctx.diagnostics.get(add).expect("mismatch reported");
    assert_eq!(d.code, DiagnosticCode::TYPE_MISMATCH);
    assert!(!d.message.is_empty());
}

#[test]
fn test_branch_without_condition() {
    let mut g = Graph::new();
    let branch = g.add_node(NodeData::If).unwrap();
    let a = g.add_node(NodeData::SetYaw).unwrap();
    let b = g.add_node(NodeData::SetYaw).unwrap();
    g.connect(branch, 0, a, 0);
    g.connect(branch, 1, b, 0);
    with_update(&mut g, branch);

    let (wasm, diags) = build(&g);
    assert_eq!(diags.message(branch), "Missing condition");
    let body = &get_bodies(&wasm)[0];
    assert!(!body.contains(&op::IF));
    assert_eq!(body, &vec![0x00, op::END]);
}

#[test]
fn test_branch_without_outputs() {
    let mut g = Graph::new();
    let branch = g.add_node(NodeData::If).unwrap();
    with_update(&mut g, branch);
    let (_, diags) = build(&g);
    assert_eq!(
        diags.get(branch).map(|d| d.code),
        Some(DiagnosticCode::MISSING_OUTPUT)
    );
}

#[test]
fn test_set_property_uses_literal_fallback() {
    let mut g = Graph::new();
    let me = g.add_node(NodeData::SelfRef).unwrap();
    let set = g
        .add_node(NodeData::SetProperty {
            target: bound_property(),
            fallback: "4.5".into(),
        })
        .unwrap();
    g.connect(me, 0, set, 1);
    with_update(&mut g, set);

    let (wasm, diags) = build(&g);
    wasmparser::validate(&wasm).expect("module should validate");
    assert!(diags.is_empty());

    let body = &get_bodies(&wasm)[0];
    assert_eq!(&body[1..4], &[op::GLOBAL_GET, 0, op::I64_CONST]);
    let tail = &body[body.len() - 8..];
    assert_eq!(tail[0], op::F32_CONST);
    assert_eq!(&tail[1..5], &4.5f32.to_le_bytes());
    assert_eq!(&tail[5..], &[op::CALL, 1, op::END]);
}

#[test]
fn test_unresolved_property_is_reported() {
    let mut g = Graph::new();
    let me = g.add_node(NodeData::SelfRef).unwrap();
    let get = g
        .add_node(NodeData::GetProperty(ReflectedRef::unbound(
            ComponentHash(7),
            "mass",
        )))
        .unwrap();
    g.connect(me, 0, get, 0);
    let mut ctx = EmitContext::new(&g);
    let mut buf = Vec::new();
    vscript_codegen::emit_node(&mut ctx, &mut buf, get, 0);
    assert!(buf.is_empty());
    assert_eq!(
        ctx.diagnostics.get(get).map(|d| d.code),
        Some(DiagnosticCode::UNRESOLVED_REFLECTION)
    );
}

#[test]
fn test_call_is_skipped_but_flow_continues() {
    let mut g = Graph::new();
    g.add_variable("x", ValueType::Float);
    let call = g
        .add_node(NodeData::Call(ReflectedRef::unbound(ComponentHash(1), "jump")))
        .unwrap();
    let c = g.add_node(NodeData::Const { value: 0.5 }).unwrap();
    let set = g.add_node(NodeData::SetVariable { var: 0 }).unwrap();
    g.connect(call, 0, set, 0);
    g.connect(c, 0, set, 1);
    with_update(&mut g, call);

    let (wasm, diags) = build(&g);
    assert_eq!(
        diags.get(call).map(|d| d.code),
        Some(DiagnosticCode::UNSUPPORTED_NODE)
    );
    let body = &get_bodies(&wasm)[0];
    assert_eq!(body[body.len() - 3..], [op::GLOBAL_SET, 1, op::END]);
}

#[test]
fn test_flow_loop_is_cut() {
    let mut g = Graph::new();
    g.add_variable("x", ValueType::Float);
    let c = g.add_node(NodeData::Const { value: 1.0 }).unwrap();
    let a = g.add_node(NodeData::SetVariable { var: 0 }).unwrap();
    let b = g.add_node(NodeData::SetVariable { var: 0 }).unwrap();
    g.connect(c, 0, a, 1);
    g.connect(c, 0, b, 1);
    g.connect(a, 0, b, 0);
    g.connect(b, 0, a, 0);
    with_update(&mut g, a);

    let (wasm, diags) = build(&g);
    wasmparser::validate(&wasm).expect("module should validate");
    assert_eq!(
        diags.get(a).map(|d| d.code),
        Some(DiagnosticCode::FLOW_CYCLE)
    );
}

#[test]
fn test_long_statement_chain() {
    const LEN: usize = 4000;
    let mut g = Graph::new();
    g.add_variable("x", ValueType::Float);
    let c = g.add_node(NodeData::Const { value: 1.0 }).unwrap();
    let first = g.add_node(NodeData::SetVariable { var: 0 }).unwrap();
    g.connect(c, 0, first, 1);
    let mut last = first;
    for _ in 1..LEN {
        let set = g.add_node(NodeData::SetVariable { var: 0 }).unwrap();
        g.connect(c, 0, set, 1);
        g.connect(last, 0, set, 0);
        last = set;
    }
    with_update(&mut g, first);

    let (wasm, diags) = build(&g);
    wasmparser::validate(&wasm).expect("module should validate");
    assert!(diags.is_empty());
    // f32.const (5) + global.set 1 (2) per statement, plus locals and end.
    assert_eq!(get_bodies(&wasm)[0].len(), LEN * 7 + 2);
}

#[test]
fn test_deep_float_chain_uses_float_family() {
    let mut g = Graph::new();
    g.add_variable("x", ValueType::Float);
    let c = g.add_node(NodeData::Const { value: 1.0 }).unwrap();
    let mut top = c;
    for _ in 0..300 {
        let add = g.add_node(NodeData::Add).unwrap();
        g.connect(top, 0, add, 0);
        g.connect(c, 0, add, 1);
        top = add;
    }
    let set = g.add_node(NodeData::SetVariable { var: 0 }).unwrap();
    g.connect(top, 0, set, 1);
    with_update(&mut g, set);

    let (wasm, diags) = build(&g);
    assert!(diags.is_empty(), "{:?}", diags.iter().next());
    wasmparser::validate(&wasm).expect("module should validate");
    let body = &get_bodies(&wasm)[0];
    assert!(!body.contains(&op::I32_ADD));
    assert_eq!(body[body.len() - 4..], [op::F32_ADD, op::GLOBAL_SET, 1, op::END]);
}

// ══════════════════════════════════════════════════════════════════════════════
// Execution
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Default)]
struct HostState {
    yaw_calls: Vec<(i32, f32)>,
    property_sets: Vec<(i32, i64, f32)>,
}

fn instantiate(wasm: &[u8]) -> (wasmi::Store<HostState>, wasmi::Instance) {
    let engine = wasmi::Engine::default();
    let module = wasmi::Module::new(&engine, wasm).expect("failed to parse WASM module");
    let mut store = wasmi::Store::new(&engine, HostState::default());
    let mut linker = <wasmi::Linker<HostState>>::new(&engine);
    linker
        .func_wrap(
            "LumixAPI",
            "setYaw",
            |mut caller: wasmi::Caller<'_, HostState>, entity: i32, yaw: f32| {
                caller.data_mut().yaw_calls.push((entity, yaw));
            },
        )
        .expect("link setYaw");
    linker
        .func_wrap(
            "LumixAPI",
            "setPropertyFloat",
            |mut caller: wasmi::Caller<'_, HostState>, entity: i32, prop: i64, value: f32| {
                caller.data_mut().property_sets.push((entity, prop, value));
            },
        )
        .expect("link setPropertyFloat");
    linker
        .func_wrap(
            "LumixAPI",
            "getPropertyFloat",
            |_caller: wasmi::Caller<'_, HostState>, _entity: i32, _prop: i64| -> f32 { 10.0 },
        )
        .expect("link getPropertyFloat");
    let instance = linker
        .instantiate(&mut store, &module)
        .expect("instantiation failed")
        .start(&mut store)
        .expect("start failed");
    (store, instance)
}

#[test]
fn test_update_sets_yaw_from_parameter() {
    let mut g = Graph::new();
    let me = g.add_node(NodeData::SelfRef).unwrap();
    let yaw = g.add_node(NodeData::SetYaw).unwrap();
    let update = with_update(&mut g, yaw);
    g.connect(me, 0, yaw, 1);
    g.connect(update, 1, yaw, 2);

    let (wasm, _) = build(&g);
    let (mut store, instance) = instantiate(&wasm);
    let update = instance
        .get_typed_func::<(f32,), ()>(&store, "update")
        .expect("no update export");
    update.call(&mut store, (0.25,)).expect("update() trapped");
    assert_eq!(store.data().yaw_calls, vec![(0, 0.25)]);
}

#[test]
fn test_property_round_trip_through_host() {
    let mut g = Graph::new();
    let me = g.add_node(NodeData::SelfRef).unwrap();
    let get = g.add_node(NodeData::GetProperty(bound_property())).unwrap();
    let two = g.add_node(NodeData::Const { value: 2.0 }).unwrap();
    let mul = g.add_node(NodeData::Mul).unwrap();
    let set = g
        .add_node(NodeData::SetProperty {
            target: bound_property(),
            fallback: String::new(),
        })
        .unwrap();
    g.connect(me, 0, get, 0);
    g.connect(get, 0, mul, 0);
    g.connect(two, 0, mul, 1);
    g.connect(me, 0, set, 1);
    g.connect(mul, 0, set, 2);
    let start = g.add_node(NodeData::Start).unwrap();
    g.connect(start, 0, set, 0);

    let (wasm, diags) = build(&g);
    assert!(diags.is_empty(), "{diags:?}");
    let (mut store, instance) = instantiate(&wasm);
    let start = instance
        .get_typed_func::<(), ()>(&store, "start")
        .expect("no start export");
    start.call(&mut store, ()).expect("start() trapped");

    let hash = PropertyHash::of("physics", "mass").0 as i64;
    assert_eq!(store.data().property_sets, vec![(0, hash, 20.0)]);
}

#[test]
fn test_branch_runs_selected_side() {
    let mut g = Graph::new();
    g.add_variable("hits", ValueType::Float);
    let branch = g.add_node(NodeData::If).unwrap();
    let key = g.add_node(NodeData::KeyInput).unwrap();
    g.connect(key, 0, branch, 0);
    let zero = g.add_node(NodeData::GetVariable { var: 0 }).unwrap();
    let gt = g.add_node(NodeData::Compare(CompareOp::Gt)).unwrap();
    let one = g.add_node(NodeData::Const { value: 1.0 }).unwrap();
    g.connect(one, 0, gt, 0);
    g.connect(zero, 0, gt, 1);
    g.connect(gt, 0, branch, 1);
    let on_true = g.add_node(NodeData::SetVariable { var: 0 }).unwrap();
    let on_false = g.add_node(NodeData::SetYaw).unwrap();
    g.connect(branch, 0, on_true, 0);
    g.connect(branch, 1, on_false, 0);
    g.connect(one, 0, on_true, 1);
    let me = g.add_node(NodeData::SelfRef).unwrap();
    g.connect(me, 0, on_false, 1);
    g.connect(one, 0, on_false, 2);

    let (wasm, diags) = build(&g);
    assert!(diags.is_empty(), "{diags:?}");
    let (mut store, instance) = instantiate(&wasm);
    let on_key = instance
        .get_typed_func::<(i32,), ()>(&store, "onKeyEvent")
        .expect("no onKeyEvent export");

    // 1 > 0: the variable is set.
    on_key.call(&mut store, (65,)).expect("onKeyEvent() trapped");
    assert!(store.data().yaw_calls.is_empty());

    // 1 > 1 fails: yaw is set instead.
    on_key.call(&mut store, (65,)).expect("onKeyEvent() trapped");
    assert_eq!(store.data().yaw_calls, vec![(0, 1.0)]);
}
