//! Text layer placement, selection, ordering and editing.

mod common;

use common::loaded_session;
use egui::pos2;
use photo_edit::{EditorSession, LayerEdit, PointerButton, Tool};
use pollster::block_on;

fn texts(session: &EditorSession) -> Vec<String> {
    session.document().layers.iter().map(|l| l.text.clone()).collect()
}

fn with_layers(labels: &[&str]) -> EditorSession {
    let mut session = loaded_session(400, 300);
    for (i, label) in labels.iter().enumerate() {
        session.add_text_layer(pos2(10.0, 40.0 * i as f32)).unwrap();
        session
            .edit_active_layer(LayerEdit::Text(label.to_string()))
            .unwrap();
    }
    session
}

// ============================================================================
// Ordering
// ============================================================================

#[test]
fn test_move_top_layer_down_one_step() {
    let mut session = with_layers(&["A", "B", "C"]);
    session.set_active_layer(Some(2));
    assert!(session.move_active_layer(-1).unwrap());
    assert_eq!(texts(&session), ["A", "C", "B"]);
    assert_eq!(session.document().active_layer(), Some(1));

    block_on(session.undo()).unwrap();
    assert_eq!(texts(&session), ["A", "B", "C"]);
}

#[test]
fn test_move_past_the_ends_is_rejected() {
    let mut session = with_layers(&["A", "B"]);
    session.set_active_layer(Some(1));
    assert!(!session.move_active_layer(1).unwrap());
    session.set_active_layer(Some(0));
    assert!(!session.move_active_layer(-1).unwrap());
    assert_eq!(texts(&session), ["A", "B"]);
}

#[test]
fn test_delete_active_layer() {
    let mut session = with_layers(&["A", "B", "C"]);
    session.set_active_layer(Some(1));
    assert!(session.delete_active_layer().unwrap());
    assert_eq!(texts(&session), ["A", "C"]);
    block_on(session.undo()).unwrap();
    assert_eq!(texts(&session), ["A", "B", "C"]);
}

// ============================================================================
// Placement and Hit Testing
// ============================================================================

#[test]
fn test_text_tool_places_named_layers_with_defaults() {
    let mut session = loaded_session(200, 200);
    session.set_tool(Tool::Text);
    session.click(pos2(20.0, 20.0)).unwrap();
    session.click(pos2(60.0, 90.0)).unwrap();

    let layers = &session.document().layers;
    assert_eq!(layers.len(), 2);
    assert_eq!(layers[0].name, "Text 1");
    assert_eq!(layers[1].name, "Text 2");
    assert_eq!(layers[1].weight, 600);
    assert_eq!(layers[1].color.to_hex(), "#ffffff");
    assert_eq!(session.document().active_layer(), Some(1));
}

#[test]
fn test_text_tool_is_inert_in_crop_mode() {
    let mut session = loaded_session(200, 200);
    session.set_tool(Tool::Text);
    session.toggle_crop();
    assert_eq!(session.click(pos2(20.0, 20.0)).unwrap(), None);
    assert!(session.document().layers.is_empty());
}

#[test]
fn test_pointer_selects_topmost_visible_layer() {
    let mut session = loaded_session(200, 200);
    session.add_text_layer(pos2(10.0, 10.0)).unwrap();
    session.add_text_layer(pos2(20.0, 20.0)).unwrap();
    session.set_active_layer(None);

    session.pointer_down(pos2(25.0, 25.0), PointerButton::Primary);
    session.pointer_up(pos2(25.0, 25.0)).unwrap();
    assert_eq!(session.document().active_layer(), Some(1));

    session.edit_layer(1, LayerEdit::Visible(false)).unwrap();
    session.pointer_down(pos2(25.0, 25.0), PointerButton::Primary);
    session.pointer_up(pos2(25.0, 25.0)).unwrap();
    assert_eq!(session.document().active_layer(), Some(0));
}

#[test]
fn test_dragging_layer_under_zoom_moves_in_image_pixels() {
    let mut session = loaded_session(200, 200);
    session.add_text_layer(pos2(50.0, 50.0)).unwrap();
    session.set_viewport(2.0, 0.0, 0.0);

    // Layer origin is at screen (100, 100) now.
    session.pointer_down(pos2(105.0, 105.0), PointerButton::Primary);
    session.pointer_move(pos2(125.0, 95.0));
    session.pointer_up(pos2(125.0, 95.0)).unwrap();
    let layer = &session.document().layers[0];
    assert_eq!((layer.x, layer.y), (60.0, 45.0));

    block_on(session.undo()).unwrap();
    let layer = &session.document().layers[0];
    assert_eq!((layer.x, layer.y), (50.0, 50.0));
}

#[test]
fn test_middle_button_pans_even_over_a_layer() {
    let mut session = loaded_session(200, 200);
    session.add_text_layer(pos2(10.0, 10.0)).unwrap();
    session.pointer_down(pos2(15.0, 15.0), PointerButton::Middle);
    session.pointer_move(pos2(45.0, 5.0));
    session.pointer_up(pos2(45.0, 5.0)).unwrap();
    assert_eq!((session.document().layers[0].x, session.document().layers[0].y), (10.0, 10.0));
    assert_eq!(session.document().viewport.pan_x, 30.0);
    assert_eq!(session.document().viewport.pan_y, -10.0);
}

// ============================================================================
// Property Edits
// ============================================================================

#[test]
fn test_preview_edits_commit_once() {
    let mut session = with_layers(&["A"]);
    let steps = session.history().undo_len();
    for size in [40.0, 48.0, 56.0] {
        session.preview_layer_edit(0, LayerEdit::FontSize(size));
    }
    assert_eq!(session.history().undo_len(), steps);
    session.commit().unwrap();
    assert_eq!(session.history().undo_len(), steps + 1);

    block_on(session.undo()).unwrap();
    assert_eq!(session.document().layers[0].font_size, 32.0);
}

#[test]
fn test_weight_is_clamped_to_css_range() {
    let mut session = with_layers(&["A"]);
    session.edit_active_layer(LayerEdit::Weight(2000)).unwrap();
    assert_eq!(session.document().layers[0].weight, 900);
    session
        .edit_active_layer(LayerEdit::Rename("Title".into()))
        .unwrap();
    assert_eq!(session.document().layers[0].name, "Title");
}
