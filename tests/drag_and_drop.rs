use robolink_blocks::catalog::BlockCatalog;
use robolink_blocks::clock::{FixedClock, TickClock};
use robolink_blocks::editor::{
    Anchor, ContainerRef, DragSource, DropAction, DropOutcome, DropRejected, DropTarget, Editor,
    FixedLayout, GestureState, NoLayout, StackLayout,
};
use robolink_blocks::model::{Category, SlotContent};
use robolink_blocks::registry::VariableRegistry;

fn editor() -> Editor<TickClock> {
    Editor::new(
        BlockCatalog::robot_default(),
        VariableRegistry::default(),
        TickClock::new(1_700_000_000_000, 7),
    )
}

fn root() -> DropTarget {
    DropTarget::Workspace {
        pointer_y: f32::INFINITY,
    }
}

fn place(editor: &mut Editor<TickClock>, template: &str, target: DropTarget) -> String {
    editor.start_drag(DragSource::Palette(template.to_string()));
    match editor.drop(&target, &NoLayout).expect("drop accepted") {
        DropOutcome::Inserted { id, .. } | DropOutcome::Slotted { id, .. } => id,
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[test]
fn palette_drop_on_empty_root() {
    let mut ed = Editor::new(
        BlockCatalog::robot_default(),
        VariableRegistry::default(),
        FixedClock(1_700_000_000_123),
    );
    ed.start_drag(DragSource::Palette("block-steps-x".into()));
    let outcome = ed.drop(&root(), &NoLayout).unwrap();
    assert_eq!(
        outcome,
        DropOutcome::Inserted {
            id: "block-steps-x-1700000000123".into(),
            container: ContainerRef::Root
        }
    );
    let tree = ed.tree();
    assert_eq!(tree.top_level.len(), 1);
    let block = &tree.top_level[0];
    assert!(!block.palette);
    assert_eq!(block.template_id, "block-steps-x");
    assert_ne!(block.id, block.template_id);
    assert!(block.children.is_none());
    assert!(block.slots.iter().all(SlotContent::is_empty));
    assert_eq!(*ed.engine().state(), GestureState::Idle);
}

#[test]
fn control_block_gets_empty_children() {
    let mut ed = editor();
    let id = place(&mut ed, "block-repeat", root());
    let repeat = &ed.tree().top_level[0];
    assert_eq!(repeat.id, id);
    assert_eq!(repeat.children.as_ref().map(Vec::len), Some(0));
}

#[test]
fn fresh_ids_never_collide() {
    let mut ed = Editor::new(
        BlockCatalog::robot_default(),
        VariableRegistry::default(),
        FixedClock(5),
    );
    let mut ids = Vec::new();
    for _ in 0..5 {
        ed.start_drag(DragSource::Palette("block-reset".into()));
        match ed.drop(&root(), &NoLayout).unwrap() {
            DropOutcome::Inserted { id, .. } => ids.push(id),
            other => panic!("{other:?}"),
        }
    }
    let mut unique = ids.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), 5);
}

#[test]
fn rejected_drops_leave_the_tree_untouched() {
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
    let before = ed.tree().clone();

    let attempts = vec![
        (
            DragSource::Palette("block-reset".into()),
            DropTarget::Slot {
                block: steps.clone(),
                slot: 0,
            },
        ),
        (DragSource::Palette("block-reset".into()), DropTarget::Outside),
        (DragSource::Palette("block-nope".into()), root()),
        (DragSource::Workspace("ghost".into()), root()),
        (
            DragSource::Workspace(repeat.clone()),
            DropTarget::Slot {
                block: steps.clone(),
                slot: 0,
            },
        ),
        (
            DragSource::Palette("block-get-X-pos".into()),
            DropTarget::Slot {
                block: steps.clone(),
                slot: 9,
            },
        ),
    ];
    for (source, target) in attempts {
        ed.start_drag(source.clone());
        let result = ed.drop(&target, &NoLayout);
        assert!(result.is_err(), "{source:?} onto {target:?}");
        assert_eq!(ed.tree(), &before, "{source:?} onto {target:?}");
        assert!(!ed.engine().is_dragging());
    }
}

#[test]
fn type_mismatch_keeps_existing_occupant() {
    let mut ed = editor();
    let steps = place(&mut ed, "block-steps-x", root());
    let slot = DropTarget::Slot {
        block: steps.clone(),
        slot: 0,
    };
    let var = place(&mut ed, "block-get-X-pos", slot.clone());

    ed.start_drag(DragSource::Palette("block-measure".into()));
    let err = ed.drop(&slot, &NoLayout).unwrap_err();
    assert_eq!(
        err,
        DropRejected::TypeMismatch {
            category: Category::Measure,
            holder: steps.clone(),
            slot: 0
        }
    );
    let holder = &ed.tree().top_level[0];
    assert_eq!(holder.slots[0].block().map(|b| b.id.as_str()), Some(var.as_str()));
}

#[test]
fn move_preserves_id_and_subtree() {
    let mut ed = editor();
    let repeat = place(&mut ed, "block-repeat", root());
    let inner = DropTarget::Block {
        block: repeat.clone(),
        pointer_y: f32::INFINITY,
    };
    let steps = place(&mut ed, "block-steps-y", inner);
    place(
        &mut ed,
        "block-get-Y-pos",
        DropTarget::Slot {
            block: steps.clone(),
            slot: 0,
        },
    );
    let snapshot = ed.tree().top_level[0].clone();
    let reset = place(&mut ed, "block-reset", root());

    // move the repeat after the reset
    ed.start_drag(DragSource::Workspace(repeat.clone()));
    ed.drop(&root(), &NoLayout).unwrap();

    let ids: Vec<_> = ed.tree().top_level.iter().map(|b| b.id.clone()).collect();
    assert_eq!(ids, [reset, repeat]);
    assert_eq!(ed.tree().top_level[1], snapshot);
    assert_eq!(ed.tree().block_count(), 4);
}

#[test]
fn drop_before_sibling_uses_geometry() {
    let mut ed = editor();
    let a = place(&mut ed, "block-reset", root());
    let b = place(&mut ed, "block-measure", root());
    let layout = FixedLayout::new().with(&a, 0.0, 40.0).with(&b, 40.0, 40.0);

    ed.start_drag(DragSource::Palette("block-break".into()));
    let pointer = DropTarget::Workspace { pointer_y: 45.0 };
    assert_eq!(
        ed.hover(&pointer, &layout).unwrap(),
        DropAction::Insert {
            container: ContainerRef::Root,
            anchor: Anchor::Before(b.clone())
        }
    );
    ed.drop(&pointer, &layout).unwrap();
    let order: Vec<_> = ed.tree().top_level.iter().map(|x| x.template_id.as_str()).collect();
    assert_eq!(order, ["block-reset", "block-break", "block-measure"]);
}

#[test]
fn hover_does_not_mutate() {
    let mut ed = editor();
    let a = place(&mut ed, "block-reset", root());
    let before = ed.tree().clone();
    ed.start_drag(DragSource::Workspace(a));
    let _ = ed.hover(&DropTarget::Disposal, &NoLayout);
    let _ = ed.hover(&root(), &NoLayout);
    assert_eq!(ed.tree(), &before);
    assert!(ed.engine().is_dragging());
    ed.cancel_drag();
    assert_eq!(ed.tree(), &before);
    assert!(!ed.engine().is_dragging());
}

#[test]
fn dropping_on_a_plain_block_nests_into_its_container() {
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
    ed.start_drag(DragSource::Palette("block-reset".into()));
    let outcome = ed
        .drop(
            &DropTarget::Block {
                block: steps,
                pointer_y: f32::INFINITY,
            },
            &NoLayout,
        )
        .unwrap();
    assert!(matches!(
        outcome,
        DropOutcome::Inserted { container: ContainerRef::Children(ref parent), .. } if *parent == repeat
    ));
    assert_eq!(ed.tree().top_level[0].children.as_ref().unwrap().len(), 2);
}

#[test]
fn cannot_nest_into_own_subtree_via_slot() {
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
    let before = ed.tree().clone();
    ed.start_drag(DragSource::Workspace(repeat.clone()));
    let err = ed
        .drop(&DropTarget::Slot { block: steps, slot: 0 }, &NoLayout)
        .unwrap_err();
    // the type check would also refuse it, but self-nesting is reported first
    assert_eq!(err, DropRejected::IntoOwnSubtree { carried: repeat });
    assert_eq!(ed.tree(), &before);
}

#[test]
fn slot_drop_evicts_to_root_end() {
    let mut ed = editor();
    let steps = place(&mut ed, "block-steps-z", root());
    let slot = DropTarget::Slot {
        block: steps.clone(),
        slot: 0,
    };
    let first = place(&mut ed, "block-get-X-pos", slot.clone());
    place(&mut ed, "block-reset", root());

    ed.start_drag(DragSource::Palette("block-get-Y-pos".into()));
    let outcome = ed.drop(&slot, &NoLayout).unwrap();
    let DropOutcome::Slotted { evicted, .. } = outcome else {
        panic!("expected slot outcome");
    };
    assert_eq!(evicted.as_deref(), Some(first.as_str()));
    let last = ed.tree().top_level.last().unwrap();
    assert_eq!(last.id, first);
    assert!(!last.palette);
    assert_eq!(
        ed.tree().top_level[0].slots[0].block().unwrap().template_id,
        "block-get-Y-pos"
    );
}

#[test]
fn literal_is_replaced_by_block() {
    let mut ed = editor();
    let steps = place(&mut ed, "block-steps-x", root());
    ed.set_literal(&steps, 0, "15").unwrap();
    let DropOutcome::Slotted { evicted, .. } = ({
        ed.start_drag(DragSource::Palette("block-get-X-pos".into()));
        ed.drop(&DropTarget::Slot { block: steps, slot: 0 }, &NoLayout).unwrap()
    }) else {
        panic!("expected slot outcome");
    };
    assert_eq!(evicted, None);
    assert_eq!(ed.tree().top_level.len(), 1);
}

#[test]
fn disposal() {
    let mut ed = editor();
    let repeat = place(&mut ed, "block-repeat", root());
    place(
        &mut ed,
        "block-reset",
        DropTarget::Block {
            block: repeat.clone(),
            pointer_y: f32::INFINITY,
        },
    );

    ed.start_drag(DragSource::Palette("block-reset".into()));
    assert_eq!(ed.drop(&DropTarget::Disposal, &NoLayout), Ok(DropOutcome::Ignored));
    assert_eq!(ed.tree().block_count(), 2);

    ed.start_drag(DragSource::Workspace(repeat.clone()));
    assert_eq!(
        ed.drop(&DropTarget::Disposal, &NoLayout),
        Ok(DropOutcome::Deleted {
            id: repeat,
            removed: 2
        })
    );
    assert!(ed.tree().is_empty());
}

#[test]
fn drop_without_drag() {
    let mut ed = editor();
    assert_eq!(
        ed.drop(&root(), &NoLayout),
        Err(DropRejected::NotDragging)
    );
}

#[test]
fn clear_needs_confirmation() {
    let mut ed = editor();
    place(&mut ed, "block-reset", root());
    assert!(!ed.clear(|| false));
    assert_eq!(ed.tree().block_count(), 1);
    assert!(ed.clear(|| true));
    assert!(ed.tree().is_empty());
}

#[test]
fn removing_a_variable_purges_placed_copies() {
    let mut ed = editor();
    ed.add_variable("speed").unwrap();
    let steps = place(&mut ed, "block-steps-x", root());
    let var = place(
        &mut ed,
        "block-get-speed-pos",
        DropTarget::Slot {
            block: steps.clone(),
            slot: 0,
        },
    );
    assert_eq!(ed.remove_name("speed"), vec![var]);
    assert!(ed.tree().top_level[0].slots[0].is_empty());
    assert!(ed.registry().lookup("speed").is_none());

    ed.start_drag(DragSource::Palette("block-get-speed-pos".into()));
    assert_eq!(
        ed.drop(&root(), &NoLayout),
        Err(DropRejected::UnknownTemplate("block-get-speed-pos".into()))
    );
}

#[test]
fn stacked_layout_drop_before() {
    let mut ed = editor();
    let a = place(&mut ed, "block-reset", root());
    place(&mut ed, "block-measure", root());
    let layout = StackLayout::of(ed.tree(), 30.0);
    let pointer_y = layout.pointer_before(&a).unwrap();
    ed.start_drag(DragSource::Palette("block-break".into()));
    ed.drop(&DropTarget::Workspace { pointer_y }, &layout).unwrap();
    assert_eq!(ed.tree().top_level[0].template_id, "block-break");
}

#[test]
fn literal_and_operator_edits() {
    use robolink_blocks::editor::EditError;

    let mut ed = editor();
    let calc = place(&mut ed, "block-calc", root());
    assert_eq!(
        ed.set_literal(&calc, 0, "3"),
        Err(EditError::NotLiteralSlot {
            block: calc.clone(),
            slot: 0
        })
    );
    ed.set_literal(&calc, 1, "3").unwrap();
    ed.set_literal(&calc, 1, "").unwrap();
    assert!(ed.tree().top_level[0].slots[1].is_empty());
    assert!(matches!(
        ed.set_literal(&calc, 5, "1"),
        Err(EditError::NoSuchSlot { .. })
    ));

    ed.set_operator(&calc, Some("pow")).unwrap();
    assert_eq!(ed.tree().top_level[0].text(), "calculate pow");
    assert!(matches!(
        ed.set_operator(&calc, Some("%")),
        Err(EditError::UnknownOperator { .. })
    ));
    ed.set_operator(&calc, None).unwrap();
    assert_eq!(ed.tree().top_level[0].text(), "calculate");
}
