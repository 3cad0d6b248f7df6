/// Which feed the list pane shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Mine,
    All,
}

impl View {
    pub const ALL: [View; 2] = [View::Mine, View::All];

    pub fn heading(self) -> &'static str {
        match self {
            Self::Mine => "Drops for Me",
            Self::All => "Drops for Anyone",
        }
    }

    pub fn toggle_label(self) -> &'static str {
        match self {
            Self::Mine => "My Drops",
            Self::All => "All Drops",
        }
    }

    /// Used in messages: "Failed to load my drops".
    pub fn noun(self) -> &'static str {
        match self {
            Self::Mine => "my",
            Self::All => "all",
        }
    }

    pub fn empty_message(self) -> &'static str {
        match self {
            Self::Mine => "You have no drops yet. Press n to create one!",
            Self::All => "There are no active drops.",
        }
    }
}

#[derive(Debug, Default)]
pub struct ViewController {
    active: View,
}

impl ViewController {
    pub fn active(&self) -> View {
        self.active
    }

    /// Returns `true` when the selection changed. Never fetches; the caller
    /// decides whether to refresh.
    pub fn set_active_view(&mut self, view: View) -> bool {
        if self.active == view {
            return false;
        }
        self.active = view;
        true
    }

    /// Toggle controls in display order; exactly one is active.
    pub fn toggles(&self) -> [(View, bool); 2] {
        View::ALL.map(|v| (v, v == self.active))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_mine_and_is_idempotent() {
        let mut vc = ViewController::default();
        assert_eq!(vc.active(), View::Mine);
        assert!(!vc.set_active_view(View::Mine));
        assert!(vc.set_active_view(View::All));
        assert!(!vc.set_active_view(View::All));
        assert_eq!(vc.active().heading(), "Drops for Anyone");
    }

    #[test]
    fn exactly_one_toggle_active() {
        let mut vc = ViewController::default();
        vc.set_active_view(View::All);
        let active: Vec<View> = vc
            .toggles()
            .iter()
            .filter(|(_, on)| *on)
            .map(|(v, _)| *v)
            .collect();
        assert_eq!(active, vec![View::All]);
    }
}
