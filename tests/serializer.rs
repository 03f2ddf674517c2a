use robolink_blocks::catalog::{BlockCatalog, BlockTemplate};
use robolink_blocks::clock::{FixedClock, TickClock};
use robolink_blocks::editor::{DragSource, DropOutcome, DropTarget, Editor, NoLayout};
use robolink_blocks::generator::{ProgramSubmission, serialize};
use robolink_blocks::model::{BlockKind, Category, SlotSpec};
use robolink_blocks::registry::VariableRegistry;

fn editor() -> Editor<FixedClock> {
    Editor::new(
        BlockCatalog::robot_default(),
        VariableRegistry::default(),
        FixedClock(1_700_000_000_000),
    )
}

fn root() -> DropTarget {
    DropTarget::Workspace {
        pointer_y: f32::INFINITY,
    }
}

fn place<C: robolink_blocks::Clock>(ed: &mut Editor<C>, template: &str, target: DropTarget) -> String {
    ed.start_drag(DragSource::Palette(template.to_string()));
    match ed.drop(&target, &NoLayout).expect("drop accepted") {
        DropOutcome::Inserted { id, .. } | DropOutcome::Slotted { id, .. } => id,
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[test]
fn control_containing_move() {
    let mut ed = editor();
    let repeat = place(&mut ed, "block-repeat", root());
    let steps = place(
        &mut ed,
        "block-steps-x",
        DropTarget::Block {
            block: repeat.clone(),
            pointer_y: f32::INFINITY,
        },
    );

    let program = ed.program();
    assert_eq!(program.len(), 1);
    let node = &program[0];
    assert_eq!(node.id, repeat);
    assert_eq!(node.node_type, "block-controll");
    assert_eq!(node.text, "repeat");
    assert_eq!(node.children.len(), 1);
    assert_eq!(node.children[0].id, steps);
    assert_eq!(node.children[0].node_type, "block-move");
    assert!(node.children[0].children.is_empty());
}

#[test]
fn position_axes_in_order() {
    let mut ed = editor();
    ed.add_position("home").unwrap();
    let pos = place(&mut ed, "block-get-home-pos", root());
    ed.set_literal(&pos, 0, "1").unwrap();
    ed.set_literal(&pos, 1, "2").unwrap();
    ed.set_literal(&pos, 2, "3").unwrap();

    let program = ed.program();
    let vars = &program[0].variables;
    assert_eq!(program[0].node_type, "block-pos");
    assert_eq!(program[0].text, "home");
    assert_eq!(vars.len(), 3);
    let values: Vec<_> = vars.iter().map(|v| v.value.as_deref()).collect();
    assert_eq!(values, [Some("1"), Some("2"), Some("3")]);
    for var in vars {
        assert_eq!(var.var_type, "block-variable");
        assert!(var.text.starts_with("var"));
        assert_eq!(var.id, var.text);
    }
    let mut names: Vec<_> = vars.iter().map(|v| v.text.as_str()).collect();
    names.sort();
    names.dedup();
    assert_eq!(names.len(), 3);
    assert!(ed.registry().lookup("home").is_some());
}

#[test]
fn empty_axis_is_unset() {
    let mut ed = editor();
    let pos = place(&mut ed, "block-get-p1-pos", root());
    ed.set_literal(&pos, 1, "4").unwrap();
    let program = ed.program();
    let values: Vec<_> = program[0].variables.iter().map(|v| v.value.clone()).collect();
    assert_eq!(values, [None, Some("4".to_string()), None]);
}

#[test]
fn serialize_is_idempotent() {
    let mut ed = editor();
    ed.add_variable("speed").unwrap();
    let repeat = place(&mut ed, "block-repeat", root());
    ed.set_literal(&repeat, 0, "3").unwrap();
    let steps = place(
        &mut ed,
        "block-steps-x",
        DropTarget::Block {
            block: repeat,
            pointer_y: f32::INFINITY,
        },
    );
    place(
        &mut ed,
        "block-get-speed-pos",
        DropTarget::Slot {
            block: steps,
            slot: 0,
        },
    );
    let registry_before = ed.registry().entries().count();
    let first = ed.program();
    let second = ed.program();
    assert_eq!(first, second);
    assert_eq!(ed.registry().entries().count(), registry_before);
}

#[test]
fn same_shape_with_advancing_clock() {
    let mut ed = Editor::new(
        BlockCatalog::robot_default(),
        VariableRegistry::default(),
        TickClock::new(10, 1000),
    );
    let steps = place(&mut ed, "block-steps-z", root());
    ed.set_literal(&steps, 0, "8").unwrap();
    let a = ed.program();
    let b = ed.program();
    assert_eq!(a.len(), b.len());
    assert_eq!(a[0].variables.len(), b[0].variables.len());
    assert_eq!(a[0].variables[0].value, b[0].variables[0].value);
}

#[test]
fn bound_variable_carries_registry_value() {
    let mut ed = editor();
    ed.add_variable("speed").unwrap();
    ed.set_variable_value("speed", "25").unwrap();
    let steps = place(&mut ed, "block-steps-y", root());
    let var = place(
        &mut ed,
        "block-get-speed-pos",
        DropTarget::Slot {
            block: steps,
            slot: 0,
        },
    );
    let program = ed.program();
    assert!(program[0].children.is_empty());
    let v = &program[0].variables[0];
    assert_eq!(v.id, var);
    assert_eq!(v.text, "speed");
    assert_eq!(v.value.as_deref(), Some("25"));
}

#[test]
fn calc_operator_and_slot_order() {
    let mut ed = editor();
    let calc = place(&mut ed, "block-calc", root());
    place(
        &mut ed,
        "block-get-X-pos",
        DropTarget::Slot {
            block: calc.clone(),
            slot: 0,
        },
    );
    ed.set_literal(&calc, 1, "2").unwrap();
    ed.set_literal(&calc, 2, "5").unwrap();
    ed.set_operator(&calc, Some("*")).unwrap();

    let program = ed.program();
    let node = &program[0];
    assert_eq!(node.text, "calculate [");
    assert_eq!(node.node_type, "block-calc");
    let texts: Vec<_> = node.variables.iter().map(|v| v.text.as_str()).collect();
    assert_eq!(texts[0], "X");
    assert_eq!(node.variables[1].value.as_deref(), Some("2"));
    assert_eq!(node.variables[2].value.as_deref(), Some("5"));
    assert!(ed.preflight().is_empty());
}

#[test]
fn position_in_slot_becomes_child() {
    let mut ed = editor();
    let to_pos = place(&mut ed, "block-to-pos", root());
    let pos = place(
        &mut ed,
        "block-get-p2-pos",
        DropTarget::Slot {
            block: to_pos,
            slot: 0,
        },
    );
    let program = ed.program();
    assert_eq!(program[0].children.len(), 1);
    let child = &program[0].children[0];
    assert_eq!(child.id, pos);
    assert_eq!(child.node_type, "block-pos");
    assert_eq!(child.variables.len(), 3);
    // the move carries the same axes, under the same names
    assert_eq!(program[0].variables, child.variables);
}

#[test]
fn arithmetic_operators_use_executor_tokens() {
    let mut ed = editor();
    let calc = place(&mut ed, "block-calc", root());
    for (op, text) in [
        ("+", "calculate {"),
        ("-", "calculate }"),
        ("*", "calculate ["),
        ("/", "calculate /"),
        ("pow", "calculate pow"),
    ] {
        ed.set_operator(&calc, Some(op)).unwrap();
        assert_eq!(ed.program()[0].text, text);
    }
    // the tree keeps the readable operator
    assert_eq!(ed.tree().top_level[0].text(), "calculate pow");
}

fn custom_editor(pos: BlockKind) -> Editor<FixedClock> {
    let catalog =
        BlockCatalog::from_templates([BlockTemplate::new("block-spot", "spot", pos)]).unwrap();
    Editor::new(catalog, VariableRegistry::default(), FixedClock(42))
}

#[test]
fn named_axes_follow_xyz_whatever_the_slot_order() {
    let kind = BlockKind::new(Category::Pos)
        .with_slot(SlotSpec::named_value("Z"))
        .with_slot(SlotSpec::named_value("X"))
        .with_slot(SlotSpec::named_value("Y"));
    let mut ed = custom_editor(kind);
    let spot = place(&mut ed, "block-spot", root());
    ed.set_literal(&spot, 0, "z").unwrap();
    ed.set_literal(&spot, 1, "x").unwrap();
    ed.set_literal(&spot, 2, "y").unwrap();

    let values: Vec<_> = ed.program()[0]
        .variables
        .iter()
        .map(|v| v.value.clone())
        .collect();
    assert_eq!(
        values,
        [Some("x".to_string()), Some("y".to_string()), Some("z".to_string())]
    );
}

#[test]
fn short_position_pads_missing_axes() {
    let mut ed = custom_editor(BlockKind::new(Category::Pos).with_slot(SlotSpec::value()));
    let spot = place(&mut ed, "block-spot", root());
    ed.set_literal(&spot, 0, "7").unwrap();

    let program = ed.program();
    let vars = &program[0].variables;
    assert_eq!(vars.len(), 3);
    assert_eq!(vars[0].value.as_deref(), Some("7"));
    assert_eq!(vars[1].value, None);
    assert_eq!(vars[2].value, None);
    assert_ne!(vars[1].text, vars[2].text);
}

#[test]
fn nodes_see_only_their_own_slots() {
    let mut ed = editor();
    let repeat = place(&mut ed, "block-repeat", root());
    let steps = place(
        &mut ed,
        "block-steps-x",
        DropTarget::Block {
            block: repeat.clone(),
            pointer_y: f32::INFINITY,
        },
    );
    ed.set_literal(&steps, 0, "9").unwrap();
    let program = ed.program();
    assert!(program[0].variables.is_empty());
    assert_eq!(program[0].children[0].variables.len(), 1);
}

#[test]
fn serialize_without_editor() {
    let tree = robolink_blocks::WorkspaceTree::default();
    assert!(serialize(&tree, &VariableRegistry::default(), &FixedClock(1)).is_empty());
}

#[test]
fn submission_body_matches_program() {
    let mut ed = editor();
    place(&mut ed, "block-reset", root());
    let submission = ed.submission("http://robot.local/execute").unwrap();
    assert_eq!(submission.content_type, "application/json");
    assert_eq!(submission.nodes().unwrap(), ed.program());
    let again = ProgramSubmission::new("http://robot.local/execute", &ed.program()).unwrap();
    assert_eq!(again, submission);
}
