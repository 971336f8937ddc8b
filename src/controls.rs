//! User controls: face-size presets, the mode toggle and a cross-thread queue.
//!
//! A UI thread never touches the session directly. It queues
//! [`ControlAction`]s through a [`ControlHandle`] and the frame pipeline
//! applies them before the next frame.

use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender};

use crate::{session::Mode, Error, Result};

/// Face size presets offered to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaceSizePreset {
    /// Faces at least half the frame height
    Percent50,
    /// Faces at least 40% of the frame height
    Percent40,
    /// Faces at least 30% of the frame height
    Percent30,
    /// Faces at least 20% of the frame height
    Percent20,
}

impl FaceSizePreset {
    /// Every preset in menu order
    pub const ALL: [Self; 4] = [Self::Percent50, Self::Percent40, Self::Percent30, Self::Percent20];

    /// Preset as a whole percentage
    #[must_use]
    pub const fn percent(self) -> u32 {
        match self {
            Self::Percent50 => 50,
            Self::Percent40 => 40,
            Self::Percent30 => 30,
            Self::Percent20 => 20,
        }
    }

    /// Preset as a fraction of frame height
    #[must_use]
    pub const fn fraction(self) -> f32 {
        match self {
            Self::Percent50 => 0.5,
            Self::Percent40 => 0.4,
            Self::Percent30 => 0.3,
            Self::Percent20 => 0.2,
        }
    }

    /// Menu label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Percent50 => "Face size 50%",
            Self::Percent40 => "Face size 40%",
            Self::Percent30 => "Face size 30%",
            Self::Percent20 => "Face size 20%",
        }
    }

    /// Preset for a whole percentage
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when no preset matches.
    pub fn from_percent(percent: u32) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|preset| preset.percent() == percent)
            .ok_or_else(|| Error::InvalidInput(format!("No face size preset for {percent}%")))
    }
}

impl fmt::Display for FaceSizePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A change requested by the user, applied between frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    /// Set the minimum face size to a preset fraction of frame height
    SetFaceSize(FaceSizePreset),
    /// Switch to the other detection mode
    ToggleMode,
    /// Switch to a specific detection mode
    SetMode(Mode),
}

impl ControlAction {
    /// The user menu: the four face-size presets followed by the mode toggle
    #[must_use]
    pub fn menu() -> Vec<Self> {
        FaceSizePreset::ALL
            .into_iter()
            .map(Self::SetFaceSize)
            .chain(std::iter::once(Self::ToggleMode))
            .collect()
    }

    /// Menu title for this action while the session is in `mode`
    #[must_use]
    pub const fn label(self, mode: Mode) -> &'static str {
        match self {
            Self::SetFaceSize(preset) => preset.label(),
            // The toggle shows the mode that is currently active
            Self::ToggleMode => mode.label(),
            Self::SetMode(target) => target.label(),
        }
    }
}

/// Cloneable sender of control actions
#[derive(Debug, Clone)]
pub struct ControlHandle {
    sender: Sender<ControlAction>,
}

impl ControlHandle {
    /// Queue `action` for the next frame
    ///
    /// # Errors
    ///
    /// Returns `ChannelClosed` once the pipeline is gone.
    pub fn send(&self, action: ControlAction) -> Result<()> {
        self.sender.send(action).map_err(|_| Error::ChannelClosed)
    }

    /// Queue a face-size preset change
    ///
    /// # Errors
    ///
    /// Returns `ChannelClosed` once the pipeline is gone.
    pub fn set_face_size(&self, preset: FaceSizePreset) -> Result<()> {
        self.send(ControlAction::SetFaceSize(preset))
    }

    /// Queue a mode toggle
    ///
    /// # Errors
    ///
    /// Returns `ChannelClosed` once the pipeline is gone.
    pub fn toggle_mode(&self) -> Result<()> {
        self.send(ControlAction::ToggleMode)
    }

    /// Queue a switch to `mode`
    ///
    /// # Errors
    ///
    /// Returns `ChannelClosed` once the pipeline is gone.
    pub fn set_mode(&self, mode: Mode) -> Result<()> {
        self.send(ControlAction::SetMode(mode))
    }
}

/// Create a control handle and the receiving end drained by the pipeline
#[must_use]
pub fn channel() -> (ControlHandle, Receiver<ControlAction>) {
    let (sender, receiver) = mpsc::channel();
    (ControlHandle { sender }, receiver)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menu_order_and_labels() {
        let labels: Vec<_> = ControlAction::menu()
            .into_iter()
            .map(|action| action.label(Mode::Cascade))
            .collect();
        assert_eq!(
            labels,
            vec!["Face size 50%", "Face size 40%", "Face size 30%", "Face size 20%", "Cascade"]
        );
        assert_eq!(ControlAction::ToggleMode.label(Mode::Tracked), "Cascade (tracking)");
    }

    #[test]
    fn test_preset_from_percent() {
        assert_eq!(FaceSizePreset::from_percent(30).unwrap(), FaceSizePreset::Percent30);
        assert!(FaceSizePreset::from_percent(25).is_err());
        assert!((FaceSizePreset::Percent40.fraction() - 0.4).abs() < f32::EPSILON);
    }

    #[test]
    fn test_handle_queues_in_order() {
        let (handle, receiver) = channel();
        let other = handle.clone();
        handle.set_face_size(FaceSizePreset::Percent50).unwrap();
        other.toggle_mode().unwrap();

        let queued: Vec<_> = receiver.try_iter().collect();
        assert_eq!(
            queued,
            vec![ControlAction::SetFaceSize(FaceSizePreset::Percent50), ControlAction::ToggleMode]
        );
    }

    #[test]
    fn test_handle_reports_closed_channel() {
        let (handle, receiver) = channel();
        drop(receiver);
        assert!(matches!(handle.toggle_mode(), Err(Error::ChannelClosed)));
    }
}
