//! Pointer gestures on the preview surface.
//!
//! All pixel arithmetic lives here: hit testing against the live container rectangle and turning
//! client-pixel deltas into percent positions, scale factors and degrees. The scene only ever sees
//! the normalized results through the [`SessionStore`] action API.

use crate::foundation::core::{Affine, Point, Rect, Size, Vec2};
use crate::scene::model::{Selection, SubjectTransform};
use crate::session::store::SessionStore;

/// Radius of the resize and rotate handles, in unscaled subject pixels.
pub const HANDLE_RADIUS: f64 = 8.0;
/// Distance of the rotate handle's center above the subject's top edge.
pub const ROTATE_HANDLE_OFFSET: f64 = 16.0;
/// Client pixels of horizontal drag that double the scale.
const RESIZE_PIXELS_PER_UNIT: f64 = 200.0;
/// Degrees of rotation per client pixel of horizontal drag.
const ROTATE_DEGREES_PER_PIXEL: f64 = 0.5;

/// Subject corner carrying a resize handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Corner {
    /// Top left.
    TopLeft,
    /// Top right.
    TopRight,
    /// Bottom right.
    BottomRight,
    /// Bottom left.
    BottomLeft,
}

impl Corner {
    const ALL: [Self; 4] = [
        Self::TopLeft,
        Self::TopRight,
        Self::BottomRight,
        Self::BottomLeft,
    ];

    fn sign(self) -> Vec2 {
        match self {
            Self::TopLeft => Vec2::new(-1.0, -1.0),
            Self::TopRight => Vec2::new(1.0, -1.0),
            Self::BottomRight => Vec2::new(1.0, 1.0),
            Self::BottomLeft => Vec2::new(-1.0, 1.0),
        }
    }
}

/// What a pointer press landed on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HitTarget {
    /// The subject body.
    Subject,
    /// A corner resize handle.
    ResizeHandle(Corner),
    /// The rotate handle above the subject.
    RotateHandle,
    /// Anything else.
    Outside,
}

/// Locate `pointer` relative to the subject as drawn in the preview.
///
/// `container` is the live client rectangle of the preview surface, `footprint` the 100%-scale
/// subject size in preview pixels and `preview_width` the preview box width those pixels refer
/// to. Handles only exist while the subject is `selected`; they scale and rotate with it.
pub fn hit_test(
    container: Rect,
    footprint: Size,
    transform: &SubjectTransform,
    selected: bool,
    preview_width: f64,
    pointer: Point,
) -> HitTarget {
    let k = container.width() / preview_width * transform.scale / 100.0;
    if !(k.is_finite() && k > 0.0) {
        return HitTarget::Outside;
    }
    let center = container.origin()
        + Vec2::new(
            container.width() * transform.position.x / 100.0,
            container.height() * transform.position.y / 100.0,
        );
    // Pointer in the subject's own frame, undoing rotation then scale.
    let to_local = Affine::scale(1.0 / k) * Affine::rotate(-transform.rotation.to_radians());
    let local = (to_local * (pointer - center).to_point()).to_vec2();
    let half = Vec2::new(footprint.width / 2.0, footprint.height / 2.0);

    if selected {
        let rotate = Vec2::new(0.0, -half.y - ROTATE_HANDLE_OFFSET);
        if (local - rotate).hypot() <= HANDLE_RADIUS {
            return HitTarget::RotateHandle;
        }
        for corner in Corner::ALL {
            let s = corner.sign();
            let at = Vec2::new(s.x * half.x, s.y * half.y);
            if (local - at).hypot() <= HANDLE_RADIUS {
                return HitTarget::ResizeHandle(corner);
            }
        }
    }

    if local.x.abs() <= half.x && local.y.abs() <= half.y {
        HitTarget::Subject
    } else {
        HitTarget::Outside
    }
}

/// Kind of the active gesture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GestureKind {
    /// Dragging the subject.
    Move,
    /// Dragging a corner handle.
    Resize,
    /// Dragging the rotate handle.
    Rotate,
}

#[derive(Clone, Copy, Debug)]
enum Gesture {
    Move { start: Point, initial: Point },
    Resize { start: Point, initial: f64 },
    Rotate { start: Point, initial: f64 },
}

/// Tracks at most one move, resize or rotate gesture at a time.
#[derive(Debug, Default)]
pub struct TransformController {
    gesture: Option<Gesture>,
}

impl TransformController {
    /// Idle controller.
    pub fn new() -> Self {
        Self::default()
    }

    /// The active gesture, if any.
    pub fn active(&self) -> Option<GestureKind> {
        self.gesture.map(|g| match g {
            Gesture::Move { .. } => GestureKind::Move,
            Gesture::Resize { .. } => GestureKind::Resize,
            Gesture::Rotate { .. } => GestureKind::Rotate,
        })
    }

    /// Pointer press at `pointer` (client pixels) on `target`.
    ///
    /// Pressing the subject or a handle selects the subject and starts the matching gesture.
    /// Pressing outside deselects the subject if it was selected.
    pub fn press(&mut self, store: &mut SessionStore, target: HitTarget, pointer: Point) {
        let subject = store.scene().subject;
        self.gesture = match target {
            HitTarget::Subject => Some(Gesture::Move {
                start: pointer,
                initial: subject.position,
            }),
            HitTarget::ResizeHandle(_) => Some(Gesture::Resize {
                start: pointer,
                initial: subject.scale,
            }),
            HitTarget::RotateHandle => Some(Gesture::Rotate {
                start: pointer,
                initial: subject.rotation,
            }),
            HitTarget::Outside => {
                if store.scene().selection == Selection::Subject {
                    store.clear_selection();
                }
                None
            }
        };
        if self.gesture.is_some() {
            store.select_subject();
        }
    }

    /// Pointer motion anywhere on the page. `container` is the live preview rectangle.
    pub fn motion(&mut self, store: &mut SessionStore, pointer: Point, container: Rect) {
        let Some(gesture) = self.gesture else {
            return;
        };
        match gesture {
            Gesture::Move { start, initial } => {
                if container.width() <= 0.0 || container.height() <= 0.0 {
                    return;
                }
                let d = pointer - start;
                let x = (initial.x + d.x / container.width() * 100.0).clamp(0.0, 100.0);
                let y = (initial.y + d.y / container.height() * 100.0).clamp(0.0, 100.0);
                store.set_subject_position(Point::new(x, y));
            }
            Gesture::Resize { start, initial } => {
                let dx = pointer.x - start.x;
                store.set_subject_scale(initial * (1.0 + dx / RESIZE_PIXELS_PER_UNIT));
            }
            Gesture::Rotate { start, initial } => {
                let dx = pointer.x - start.x;
                store.set_subject_rotation((initial + dx * ROTATE_DEGREES_PER_PIXEL) % 360.0);
            }
        }
    }

    /// Pointer release anywhere; ends the active gesture.
    pub fn release(&mut self) {
        self.gesture = None;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/interact/controller.rs"]
mod tests;
