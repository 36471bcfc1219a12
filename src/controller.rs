use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::json;

use crate::analytics::{Collector, Event};
use crate::player;
use crate::trace;

/// The closed set of content tabs. Exactly one is active at any time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tab {
    Videos,
    About,
}

impl Tab {
    pub const ALL: [Tab; 2] = [Tab::Videos, Tab::About];

    pub fn title(self) -> &'static str {
        match self {
            Tab::Videos => "Videos",
            Tab::About => "About",
        }
    }

    /// The location-hash name for this tab, without the leading `#`.
    pub fn hash_name(self) -> &'static str {
        match self {
            Tab::Videos => "videos",
            Tab::About => "about",
        }
    }

    /// Parses a tab name or location hash. Accepts `videos`, `#videos`,
    /// and any casing; anything else is unknown.
    pub fn from_name(raw: &str) -> Option<Tab> {
        let name = raw.trim().trim_start_matches('#');
        Tab::ALL
            .iter()
            .copied()
            .find(|tab| tab.hash_name().eq_ignore_ascii_case(name))
    }

    pub fn next(self) -> Tab {
        match self {
            Tab::Videos => Tab::About,
            Tab::About => Tab::Videos,
        }
    }

    pub fn previous(self) -> Tab {
        match self {
            Tab::Videos => Tab::About,
            Tab::About => Tab::Videos,
        }
    }
}

impl Default for Tab {
    fn default() -> Self {
        Tab::Videos
    }
}

/// The modal dialog hosting the embedded player.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModalState {
    Closed,
    Open { video_id: String, title: String },
}

/// Where input focus currently sits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Focus {
    Card(usize),
    ModalClose,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleDirection {
    Forward,
    Backward,
}

/// Why a tab switch happened. History replay must not push new entries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SwitchCause {
    User,
    Replay,
}

/// Inputs the controller refuses without changing state.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Reject {
    #[error("unknown tab: {0:?}")]
    UnknownTab(String),
    #[error("a video id and title are required to open the player")]
    IncompleteVideo,
}

/// Location-hash history with a back/forward cursor.
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<String>,
    index: usize,
}

impl History {
    pub fn new(initial: &str) -> Self {
        Self {
            entries: vec![initial.to_string()],
            index: 0,
        }
    }

    /// Pushes a new entry, truncating any forward branch. A push identical
    /// to the current entry is skipped so repeated switches to the same tab
    /// never pile up duplicate entries.
    pub fn push(&mut self, hash: &str) {
        if self.entries[self.index] == hash {
            return;
        }
        self.entries.truncate(self.index + 1);
        self.entries.push(hash.to_string());
        self.index = self.entries.len() - 1;
    }

    pub fn back(&mut self) -> Option<&str> {
        if self.index == 0 {
            return None;
        }
        self.index -= 1;
        Some(&self.entries[self.index])
    }

    pub fn forward(&mut self) -> Option<&str> {
        if self.index + 1 >= self.entries.len() {
            return None;
        }
        self.index += 1;
        Some(&self.entries[self.index])
    }

    pub fn current(&self) -> &str {
        &self.entries[self.index]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Clone)]
pub struct Settings {
    /// How long an outgoing pane stays in layout before it is hidden.
    pub tab_hide_delay: Duration,
    /// How long after close the player frame keeps its content before it is
    /// cleared. The clear is what actually stops playback.
    pub player_clear_delay: Duration,
    /// Number of video cards focus may return to.
    pub card_count: usize,
    pub analytics: Option<Arc<dyn Collector>>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tab_hide_delay: Duration::from_millis(400),
            player_clear_delay: Duration::from_millis(300),
            card_count: 0,
            analytics: None,
        }
    }
}

/// Single source of truth for which tab is active and whether the video
/// modal is open. The UI derives everything it renders from this state; no
/// other component mutates it.
pub struct Controller {
    active_tab: Tab,
    // Panes still in layout while their exit transition runs. Each entry
    // carries its own deadline; reactivating a pane removes it here, which
    // is the "recheck before hiding" rule.
    leaving: Vec<(Tab, Instant)>,
    modal: ModalState,
    // Bumped on every open/close. Deferred clears captured under an older
    // generation are stale and must not fire.
    modal_generation: u64,
    player_src: Option<String>,
    pending_clear: Option<(Instant, u64)>,
    scroll_locked: bool,
    focus: Focus,
    focus_before_modal: Focus,
    return_focus: Option<usize>,
    history: History,
    settings: Settings,
}

impl Controller {
    /// Builds the controller from a start location. A hash naming a known
    /// tab activates it; anything else (or no hash) falls back to the
    /// default tab. The modal starts closed.
    pub fn new(settings: Settings, start_location: Option<&str>) -> Self {
        let active_tab = start_location
            .and_then(Tab::from_name)
            .unwrap_or_default();
        let history = History::new(&format!("#{}", active_tab.hash_name()));
        Self {
            active_tab,
            leaving: Vec::new(),
            modal: ModalState::Closed,
            modal_generation: 0,
            player_src: None,
            pending_clear: None,
            scroll_locked: false,
            focus: Focus::Card(0),
            focus_before_modal: Focus::Card(0),
            return_focus: None,
            history,
            settings,
        }
    }

    pub fn active_tab(&self) -> Tab {
        self.active_tab
    }

    /// The per-tab selected flag the tab controls expose.
    pub fn is_selected(&self, tab: Tab) -> bool {
        self.active_tab == tab
    }

    /// Panes currently in layout: the active pane plus any pane whose exit
    /// transition has not finished.
    pub fn visible_panes(&self) -> Vec<Tab> {
        let mut panes = vec![self.active_tab];
        for (tab, _) in &self.leaving {
            if !panes.contains(tab) {
                panes.push(*tab);
            }
        }
        panes
    }

    /// The location hash for the current tab, with the leading `#`.
    pub fn hash(&self) -> &str {
        self.history.current()
    }

    pub fn modal(&self) -> &ModalState {
        &self.modal
    }

    /// The modal's accessible-hidden flag.
    pub fn modal_hidden(&self) -> bool {
        matches!(self.modal, ModalState::Closed)
    }

    /// The URL loaded in the embedded player frame, if any. Stays populated
    /// for the close-transition delay after the modal closes.
    pub fn player_src(&self) -> Option<&str> {
        self.player_src.as_deref()
    }

    pub fn scroll_locked(&self) -> bool {
        self.scroll_locked
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn set_card_focus(&mut self, index: usize) {
        if matches!(self.modal, ModalState::Closed) {
            self.focus = Focus::Card(index);
        }
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Switches to a tab named by user-influenced data. Unknown names are
    /// rejected without any state change.
    pub fn switch_tab_named(&mut self, name: &str, now: Instant) -> Result<(), Reject> {
        match Tab::from_name(name) {
            Some(tab) => {
                self.switch_tab(tab, now);
                Ok(())
            }
            None => {
                trace::debug_log(format!("ignoring switch to unknown tab {name:?}"));
                Err(Reject::UnknownTab(name.to_string()))
            }
        }
    }

    /// User-initiated tab switch: exclusive selection, history push, and a
    /// fire-and-forget analytics notification.
    pub fn switch_tab(&mut self, tab: Tab, now: Instant) {
        self.apply_switch(tab, now, SwitchCause::User);
    }

    /// Moves the selection one tab forward or backward, wrapping at both
    /// ends. Same effects as a direct tab switch.
    pub fn cycle_tab(&mut self, direction: CycleDirection, now: Instant) {
        let target = match direction {
            CycleDirection::Forward => self.active_tab.next(),
            CycleDirection::Backward => self.active_tab.previous(),
        };
        self.switch_tab(target, now);
    }

    fn apply_switch(&mut self, tab: Tab, now: Instant, cause: SwitchCause) {
        if tab != self.active_tab {
            let outgoing = self.active_tab;
            // A rapid switch back to a pane mid-transition reactivates it;
            // its pending hide must not fire.
            self.leaving.retain(|(pane, _)| *pane != tab);
            self.leaving
                .push((outgoing, now + self.settings.tab_hide_delay));
            self.active_tab = tab;
        }

        if cause == SwitchCause::User {
            self.history.push(&format!("#{}", tab.hash_name()));
            self.emit(Event::new(
                "tab_switch",
                json!({ "tab": tab.hash_name() }),
            ));
        }
    }

    /// History back, the popstate analog. Returns false at the oldest entry.
    pub fn navigate_back(&mut self, now: Instant) -> bool {
        let Some(hash) = self.history.back().map(str::to_string) else {
            return false;
        };
        let tab = Tab::from_name(&hash).unwrap_or_default();
        self.apply_switch(tab, now, SwitchCause::Replay);
        true
    }

    /// History forward. Returns false at the newest entry.
    pub fn navigate_forward(&mut self, now: Instant) -> bool {
        let Some(hash) = self.history.forward().map(str::to_string) else {
            return false;
        };
        let tab = Tab::from_name(&hash).unwrap_or_default();
        self.apply_switch(tab, now, SwitchCause::Replay);
        true
    }

    /// Opens the video modal. An empty id or title is rejected without any
    /// state change. Reopening while already open replaces the loaded video
    /// and invalidates any pending deferred clear.
    pub fn open_modal(
        &mut self,
        video_id: &str,
        title: &str,
        opener: Option<usize>,
        _now: Instant,
    ) -> Result<(), Reject> {
        let video_id = video_id.trim();
        let title = title.trim();
        if video_id.is_empty() || title.is_empty() {
            trace::debug_log(format!(
                "refusing to open modal: id={video_id:?} title={title:?}"
            ));
            return Err(Reject::IncompleteVideo);
        }

        let embed = player::embed_url(video_id).map_err(|_| Reject::IncompleteVideo)?;

        if matches!(self.modal, ModalState::Closed) {
            self.focus_before_modal = self.focus;
        }
        self.modal = ModalState::Open {
            video_id: video_id.to_string(),
            title: title.to_string(),
        };
        self.modal_generation += 1;
        self.player_src = Some(embed);
        self.scroll_locked = true;
        self.focus = Focus::ModalClose;
        if opener.is_some() {
            self.return_focus = opener;
        }

        self.emit(Event::new(
            "video_open",
            json!({ "video_id": video_id, "title": title }),
        ));
        Ok(())
    }

    /// Closes the modal. No-op when already closed. The player frame keeps
    /// its content until the close transition elapses; the deferred clear is
    /// what stops playback.
    pub fn close_modal(&mut self, now: Instant) -> bool {
        if matches!(self.modal, ModalState::Closed) {
            return false;
        }
        self.modal = ModalState::Closed;
        self.modal_generation += 1;
        self.pending_clear = Some((
            now + self.settings.player_clear_delay,
            self.modal_generation,
        ));
        self.scroll_locked = false;

        // Return focus to the control that opened the modal, if it can
        // still be located; otherwise leave focus where it was.
        self.focus = match self.return_focus.take() {
            Some(index) if index < self.settings.card_count => Focus::Card(index),
            _ => self.focus_before_modal,
        };
        true
    }

    /// Escape key contract: closes an open modal, no-op otherwise.
    pub fn escape(&mut self, now: Instant) -> bool {
        self.close_modal(now)
    }

    /// Services deferred actions. Each action re-validates the state it
    /// captured before applying, so a superseding transition makes it a
    /// no-op. Returns true when anything changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        let mut changed = false;

        let active = self.active_tab;
        let before = self.leaving.len();
        self.leaving
            .retain(|(pane, due)| *pane == active || *due > now);
        changed |= self.leaving.len() != before;

        if let Some((due, generation)) = self.pending_clear {
            if now >= due {
                if generation == self.modal_generation {
                    self.player_src = None;
                    changed = true;
                }
                self.pending_clear = None;
            }
        }

        changed
    }

    fn emit(&self, event: Event) {
        if let Some(collector) = &self.settings.analytics {
            collector.record(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    const HIDE: Duration = Duration::from_millis(400);
    const CLEAR: Duration = Duration::from_millis(300);

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<Event>>,
    }

    impl Collector for Recorder {
        fn record(&self, event: Event) {
            self.events.lock().push(event);
        }
    }

    fn controller(start: Option<&str>) -> Controller {
        Controller::new(
            Settings {
                tab_hide_delay: HIDE,
                player_clear_delay: CLEAR,
                card_count: 3,
                analytics: None,
            },
            start,
        )
    }

    #[test]
    fn initializes_from_hash() {
        let c = controller(Some("#about"));
        assert_eq!(c.active_tab(), Tab::About);
        assert_eq!(c.hash(), "#about");
        assert!(c.modal_hidden());
    }

    #[test]
    fn unknown_hash_falls_back_to_default_tab() {
        let c = controller(Some("#bogus"));
        assert_eq!(c.active_tab(), Tab::Videos);
        assert_eq!(c.hash(), "#videos");

        let c = controller(None);
        assert_eq!(c.active_tab(), Tab::Videos);
    }

    #[test]
    fn switch_selects_exactly_one_tab_and_updates_hash() {
        let mut c = controller(None);
        let now = Instant::now();
        c.switch_tab(Tab::About, now);

        assert!(c.is_selected(Tab::About));
        assert!(!c.is_selected(Tab::Videos));
        assert_eq!(c.hash(), "#about");
        // Outgoing pane is still in layout mid-transition.
        assert_eq!(c.visible_panes(), vec![Tab::About, Tab::Videos]);
        assert!(c.tick(now + HIDE));
        assert_eq!(c.visible_panes(), vec![Tab::About]);
    }

    #[test]
    fn unknown_tab_name_changes_nothing() {
        let mut c = controller(None);
        let now = Instant::now();
        let err = c.switch_tab_named("bogus", now).unwrap_err();
        assert_eq!(err, Reject::UnknownTab("bogus".into()));
        assert_eq!(c.active_tab(), Tab::Videos);
        assert_eq!(c.hash(), "#videos");
        assert_eq!(c.history().len(), 1);
    }

    #[test]
    fn rapid_double_switch_keeps_reactivated_pane() {
        let mut c = controller(None);
        let t0 = Instant::now();
        c.switch_tab(Tab::About, t0);
        // Back before the hide fires: the videos pane is reactivated and
        // must not be hidden by the stale deferred action.
        c.switch_tab(Tab::Videos, t0 + Duration::from_millis(50));
        c.tick(t0 + HIDE * 2);
        assert!(c.visible_panes().contains(&Tab::Videos));
        assert_eq!(c.active_tab(), Tab::Videos);
    }

    #[test]
    fn repeated_identical_switches_do_not_duplicate_history() {
        let mut c = controller(None);
        let now = Instant::now();
        c.switch_tab(Tab::About, now);
        c.switch_tab(Tab::About, now);
        assert_eq!(c.history().len(), 2);
    }

    #[test]
    fn back_and_forward_replay_without_new_entries() {
        let mut c = controller(None);
        let now = Instant::now();
        c.switch_tab(Tab::About, now);
        assert_eq!(c.history().len(), 2);

        assert!(c.navigate_back(now));
        assert_eq!(c.active_tab(), Tab::Videos);
        assert_eq!(c.hash(), "#videos");
        assert_eq!(c.history().len(), 2);

        assert!(c.navigate_forward(now));
        assert_eq!(c.active_tab(), Tab::About);
        assert_eq!(c.history().len(), 2);

        assert!(!c.navigate_forward(now));
    }

    #[test]
    fn cycle_wraps_at_both_ends() {
        let mut c = controller(Some("#about"));
        let now = Instant::now();
        c.cycle_tab(CycleDirection::Forward, now);
        assert_eq!(c.active_tab(), Tab::Videos);

        let mut c = controller(None);
        c.cycle_tab(CycleDirection::Backward, now);
        assert_eq!(c.active_tab(), Tab::About);
    }

    #[test]
    fn open_modal_requires_id_and_title() {
        let mut c = controller(None);
        let now = Instant::now();
        assert_eq!(
            c.open_modal("", "Title", None, now),
            Err(Reject::IncompleteVideo)
        );
        assert_eq!(
            c.open_modal("abc123", "", None, now),
            Err(Reject::IncompleteVideo)
        );
        assert_eq!(c.modal(), &ModalState::Closed);
        assert!(c.player_src().is_none());
        assert!(!c.scroll_locked());
    }

    #[test]
    fn open_then_close_clears_player_after_delay() {
        let mut c = controller(None);
        let t0 = Instant::now();
        c.open_modal("abc123", "Title", Some(1), t0).unwrap();
        assert!(matches!(c.modal(), ModalState::Open { .. }));
        assert!(c.scroll_locked());
        assert_eq!(c.focus(), Focus::ModalClose);
        assert!(c.player_src().unwrap().contains("abc123"));

        assert!(c.close_modal(t0));
        assert_eq!(c.modal(), &ModalState::Closed);
        assert!(!c.scroll_locked());
        // Content survives until the close transition finishes.
        assert!(c.player_src().is_some());
        c.tick(t0 + CLEAR);
        assert!(c.player_src().is_none());
    }

    #[test]
    fn close_restores_focus_to_opener() {
        let mut c = controller(None);
        let now = Instant::now();
        c.open_modal("abc123", "Title", Some(2), now).unwrap();
        c.close_modal(now);
        assert_eq!(c.focus(), Focus::Card(2));
    }

    #[test]
    fn close_leaves_focus_unchanged_when_opener_is_gone() {
        let mut c = controller(None);
        let now = Instant::now();
        c.set_card_focus(1);
        // Opener index beyond the card count can no longer be located.
        c.open_modal("abc123", "Title", Some(9), now).unwrap();
        c.close_modal(now);
        assert_eq!(c.focus(), Focus::Card(1));
    }

    #[test]
    fn reopen_while_open_replaces_content() {
        let mut c = controller(None);
        let now = Instant::now();
        c.open_modal("first11", "First", Some(0), now).unwrap();
        c.open_modal("second2", "Second", Some(1), now).unwrap();
        assert_eq!(
            c.modal(),
            &ModalState::Open {
                video_id: "second2".into(),
                title: "Second".into(),
            }
        );
        assert!(c.player_src().unwrap().contains("second2"));
    }

    #[test]
    fn reopen_invalidates_pending_clear() {
        let mut c = controller(None);
        let t0 = Instant::now();
        c.open_modal("first11", "First", None, t0).unwrap();
        c.close_modal(t0);
        // Reopen before the clear fires: the stale clear must not stop the
        // new session's playback.
        c.open_modal("second2", "Second", None, t0 + Duration::from_millis(100))
            .unwrap();
        c.tick(t0 + CLEAR * 2);
        assert!(c.player_src().unwrap().contains("second2"));
    }

    #[test]
    fn escape_closes_open_modal_and_is_noop_when_closed() {
        let mut c = controller(None);
        let now = Instant::now();
        assert!(!c.escape(now));
        c.open_modal("abc123", "Title", None, now).unwrap();
        assert!(c.escape(now));
        assert_eq!(c.modal(), &ModalState::Closed);
        assert!(!c.escape(now));
    }

    #[test]
    fn emits_analytics_for_switch_and_open() {
        let recorder = Arc::new(Recorder::default());
        let mut c = Controller::new(
            Settings {
                tab_hide_delay: HIDE,
                player_clear_delay: CLEAR,
                card_count: 3,
                analytics: Some(recorder.clone()),
            },
            None,
        );
        let now = Instant::now();
        c.switch_tab(Tab::About, now);
        c.open_modal("abc123", "Title", None, now).unwrap();

        let events = recorder.events.lock();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].name, "tab_switch");
        assert_eq!(events[0].properties["tab"], "about");
        assert_eq!(events[1].name, "video_open");
        assert_eq!(events[1].properties["video_id"], "abc123");
    }

    #[test]
    fn replay_does_not_emit_analytics() {
        let recorder = Arc::new(Recorder::default());
        let mut c = Controller::new(
            Settings {
                analytics: Some(recorder.clone()),
                ..Settings::default()
            },
            None,
        );
        let now = Instant::now();
        c.switch_tab(Tab::About, now);
        c.navigate_back(now);
        assert_eq!(recorder.events.lock().len(), 1);
    }

    #[test]
    fn history_push_truncates_forward_branch() {
        let mut h = History::new("#videos");
        h.push("#about");
        h.back();
        h.push("#about");
        assert_eq!(h.len(), 2);
        assert_eq!(h.current(), "#about");
        assert!(h.forward().is_none());
    }
}
