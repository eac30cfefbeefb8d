//! Application state and event handling.
//!
//! [`App`] owns the checklist manager, the category set, and the write
//! queue, and turns key events into mutations. The main loop drives it from
//! the outside: keys go in through [`App::handle_key_event`], store events
//! through [`App::apply_sync_event`], and due writes come back out of
//! [`App::next_sync_command`].
//!
//! Writes are pumped one at a time. A new submit goes out only after the
//! previous one committed or failed, so when a failure rolls the manager
//! back, every queued-but-unsent job can still be rewritten or dropped to
//! match the rollback report.

use std::collections::VecDeque;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use taskflow_proto::category::CategoryId;
use taskflow_proto::task::TaskId;

use crate::auth::UserProfile;
use crate::checklist::{CategorySet, ChecklistManager, CommandId, MoveOutcome, WritePlan};
use crate::config::ClientConfig;
use crate::sync::{JobId, SyncCommand, SyncEvent};
use crate::ui::theme::Theme;

/// Which screen is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Sign-in / sign-up form.
    SignIn,
    /// The checklist proper.
    Checklist,
}

/// Which panel is currently focused on the checklist screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelFocus {
    /// New-task input line (default).
    Input,
    /// Task list.
    Checklist,
    /// Category list.
    Categories,
}

/// Modal input state on the checklist screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Plain navigation.
    Normal,
    /// Editing the text of a task; the input line holds the draft.
    EditingTask(TaskId),
    /// Renaming a category; the input line holds the draft.
    EditingCategory(CategoryId),
    /// Naming a new category; the input line holds the draft.
    NewCategory,
    /// Reordering the selected task with Up/Down.
    Move,
    /// Waiting for delete confirmation of a task.
    ConfirmDelete(TaskId),
}

/// Active field on the sign-in form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignInField {
    /// Email address.
    Email,
    /// Password.
    Password,
    /// Display name (sign-up only).
    DisplayName,
}

/// Sign-in form state.
#[derive(Debug, Clone)]
pub struct SignInForm {
    /// Email draft.
    pub email: String,
    /// Password draft.
    pub password: String,
    /// Display name draft (sign-up only).
    pub display_name: String,
    /// Focused field.
    pub field: SignInField,
    /// Whether the form is in sign-up mode.
    pub creating: bool,
    /// Last auth failure, shown under the form.
    pub error: Option<String>,
}

/// A submitted form, handed to the auth provider by the main loop.
#[derive(Debug, Clone)]
pub struct SignInRequest {
    /// Email as typed.
    pub email: String,
    /// Password as typed.
    pub password: String,
    /// `Some` means create the account first.
    pub display_name: Option<String>,
}

struct WriteJob {
    job: JobId,
    /// The checklist command behind this write; `None` for category writes.
    command: Option<CommandId>,
    plan: WritePlan,
}

/// Main application state.
pub struct App {
    /// Which screen is showing.
    pub screen: Screen,
    /// Sign-in form state.
    pub form: SignInForm,
    /// Checklist state for the signed-in user.
    pub manager: ChecklistManager,
    /// Categories for the signed-in user.
    pub categories: CategorySet,
    /// Focused panel.
    pub focus: PanelFocus,
    /// Modal state.
    pub mode: Mode,
    /// Input line contents.
    pub input: String,
    /// Cursor position in the input line (character index).
    pub cursor_position: usize,
    /// Selected row in the task list.
    pub selected_task: usize,
    /// Selected row in the category list.
    pub selected_category: usize,
    /// Active color palette.
    pub theme: Theme,
    /// Transient status message.
    pub notice: Option<String>,
    /// Whether the store connection is up.
    pub connected: bool,
    /// Whether the app should quit.
    pub should_quit: bool,
    /// The signed-in user.
    pub user: Option<UserProfile>,
    /// Clock format for the status bar (chrono format string).
    pub timestamp_format: String,
    seed_defaults: bool,
    seeded: bool,
    pending_sign_in: Option<SignInRequest>,
    jobs: VecDeque<WriteJob>,
    in_flight: Option<(JobId, Option<CommandId>)>,
    next_job: u64,
}

impl App {
    /// Creates the app on the sign-in screen.
    #[must_use]
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            screen: Screen::SignIn,
            form: SignInForm {
                email: config.email.clone().unwrap_or_default(),
                password: String::new(),
                display_name: String::new(),
                field: SignInField::Email,
                creating: false,
                error: None,
            },
            manager: ChecklistManager::new(""),
            categories: CategorySet::new(""),
            focus: PanelFocus::Input,
            mode: Mode::Normal,
            input: String::new(),
            cursor_position: 0,
            selected_task: 0,
            selected_category: 0,
            theme: Theme::by_name(&config.theme),
            notice: None,
            connected: true,
            should_quit: false,
            user: None,
            timestamp_format: config.timestamp_format.clone(),
            seed_defaults: config.seed_defaults,
            seeded: false,
            pending_sign_in: None,
            jobs: VecDeque::new(),
            in_flight: None,
            next_job: 0,
        }
    }

    /// Switches to the checklist screen for a signed-in user.
    pub fn signed_in(&mut self, profile: UserProfile) {
        self.manager = ChecklistManager::new(profile.user_id.clone());
        self.categories = CategorySet::new(profile.user_id.clone());
        self.user = Some(profile);
        self.screen = Screen::Checklist;
        self.form.error = None;
        self.form.password.clear();
    }

    /// Shows an auth failure under the sign-in form.
    pub fn sign_in_failed(&mut self, message: String) {
        self.form.error = Some(message);
        self.form.password.clear();
    }

    /// Takes the submitted sign-in form, if any.
    pub fn take_sign_in_request(&mut self) -> Option<SignInRequest> {
        self.pending_sign_in.take()
    }

    /// The next write to submit, if one is due and none is in flight.
    pub fn next_sync_command(&mut self) -> Option<SyncCommand> {
        if self.in_flight.is_some() {
            return None;
        }
        let job = self.jobs.pop_front()?;
        self.in_flight = Some((job.job, job.command));
        Some(SyncCommand::Submit {
            job: job.job,
            plan: job.plan,
        })
    }

    /// Applies an event from the store task.
    pub fn apply_sync_event(&mut self, event: SyncEvent) {
        match event {
            SyncEvent::Committed { job } => {
                if let Some((in_flight, command)) = self.in_flight.take() {
                    if in_flight == job {
                        if let Some(command) = command {
                            self.manager.confirm(command);
                        }
                    } else {
                        self.in_flight = Some((in_flight, command));
                    }
                }
            }
            SyncEvent::WriteFailed { job, reason } => self.on_write_failed(job, &reason),
            SyncEvent::TasksChanged(records) => {
                if self.manager.apply_task_snapshot(records) {
                    self.maybe_seed();
                }
                self.clamp_selection();
            }
            SyncEvent::CategoriesChanged(records) => {
                self.categories.apply_snapshot(records);
                self.clamp_selection();
            }
            SyncEvent::Disconnected { reason } => {
                self.connected = false;
                self.notice = Some(format!("store disconnected: {reason}"));
            }
        }
    }

    /// Handles a key event for the current screen.
    pub fn handle_key_event(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }
        match self.screen {
            Screen::SignIn => self.handle_sign_in_key(key),
            Screen::Checklist => self.handle_checklist_key(key),
        }
    }

    // -- sign-in screen ----------------------------------------------------

    fn handle_sign_in_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Tab | KeyCode::BackTab => self.cycle_sign_in_field(),
            KeyCode::F(2) => {
                self.form.creating = !self.form.creating;
                self.form.error = None;
            }
            KeyCode::Enter => self.submit_sign_in(),
            KeyCode::Char(c) => self.active_field_mut().push(c),
            KeyCode::Backspace => {
                self.active_field_mut().pop();
            }
            _ => {}
        }
    }

    const fn cycle_sign_in_field(&mut self) {
        self.form.field = match (self.form.field, self.form.creating) {
            (SignInField::Email, _) => SignInField::Password,
            (SignInField::Password, true) => SignInField::DisplayName,
            (SignInField::Password | SignInField::DisplayName, _) => SignInField::Email,
        };
    }

    const fn active_field_mut(&mut self) -> &mut String {
        match self.form.field {
            SignInField::Email => &mut self.form.email,
            SignInField::Password => &mut self.form.password,
            SignInField::DisplayName => &mut self.form.display_name,
        }
    }

    fn submit_sign_in(&mut self) {
        if self.form.email.trim().is_empty() || self.form.password.is_empty() {
            self.form.error = Some("email and password are required".to_string());
            return;
        }
        self.pending_sign_in = Some(SignInRequest {
            email: self.form.email.clone(),
            password: self.form.password.clone(),
            display_name: self
                .form
                .creating
                .then(|| self.form.display_name.clone()),
        });
    }

    // -- checklist screen --------------------------------------------------

    fn handle_checklist_key(&mut self, key: KeyEvent) {
        self.notice = None;
        match self.mode {
            Mode::ConfirmDelete(id) => self.handle_confirm_delete_key(key, id),
            Mode::Move => self.handle_move_key(key),
            Mode::EditingTask(_) | Mode::EditingCategory(_) | Mode::NewCategory => {
                self.handle_draft_key(key);
            }
            Mode::Normal => self.handle_normal_key(key),
        }
    }

    fn handle_confirm_delete_key(&mut self, key: KeyEvent, id: TaskId) {
        match key.code {
            KeyCode::Char('y' | 'Y') | KeyCode::Enter => {
                self.mode = Mode::Normal;
                match self.manager.delete_task(id) {
                    Ok(command) => self.enqueue_command(command),
                    Err(e) => self.notice = Some(e.to_string()),
                }
                self.clamp_selection();
            }
            KeyCode::Char('n' | 'N') | KeyCode::Esc => self.mode = Mode::Normal,
            _ => {}
        }
    }

    fn handle_move_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.move_selected_task(-1),
            KeyCode::Down | KeyCode::Char('j') => self.move_selected_task(1),
            KeyCode::Esc | KeyCode::Enter | KeyCode::Char('m') => self.mode = Mode::Normal,
            _ => {}
        }
    }

    fn handle_draft_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.clear_input();
                self.mode = Mode::Normal;
            }
            KeyCode::Enter => self.submit_draft(),
            KeyCode::Char(c) => self.enter_char(c),
            KeyCode::Backspace => self.delete_char(),
            KeyCode::Left => self.move_cursor_left(),
            KeyCode::Right => self.move_cursor_right(),
            KeyCode::Home => self.cursor_position = 0,
            KeyCode::End => self.cursor_position = self.input.chars().count(),
            _ => {}
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) {
        match (key.code, key.modifiers) {
            (KeyCode::Tab, KeyModifiers::SHIFT) | (KeyCode::BackTab, _) => {
                self.cycle_focus_backward();
                return;
            }
            (KeyCode::Tab, _) => {
                self.cycle_focus_forward();
                return;
            }
            _ => {}
        }
        match self.focus {
            PanelFocus::Input => self.handle_input_key(key),
            PanelFocus::Checklist => self.handle_task_list_key(key),
            PanelFocus::Categories => self.handle_category_list_key(key),
        }
    }

    fn handle_input_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => self.submit_new_task(),
            KeyCode::Char(c) => self.enter_char(c),
            KeyCode::Backspace => self.delete_char(),
            KeyCode::Left => self.move_cursor_left(),
            KeyCode::Right => self.move_cursor_right(),
            KeyCode::Home => self.cursor_position = 0,
            KeyCode::End => self.cursor_position = self.input.chars().count(),
            _ => {}
        }
    }

    fn handle_task_list_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected_task = self.selected_task.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                let last = self.manager.tasks().len().saturating_sub(1);
                if self.selected_task < last {
                    self.selected_task += 1;
                }
            }
            KeyCode::Char(' ') | KeyCode::Enter => self.toggle_selected_task(),
            KeyCode::Char('e') => {
                if let Some(task) = self.manager.tasks().get(self.selected_task) {
                    self.mode = Mode::EditingTask(task.id);
                    self.input = task.text.clone();
                    self.cursor_position = self.input.chars().count();
                }
            }
            KeyCode::Char('d') => {
                if let Some(task) = self.manager.tasks().get(self.selected_task) {
                    self.mode = Mode::ConfirmDelete(task.id);
                }
            }
            KeyCode::Char('m') => {
                if !self.manager.tasks().is_empty() {
                    self.mode = Mode::Move;
                }
            }
            KeyCode::Char('c') => self.cycle_selected_task_category(),
            KeyCode::Char('r') => {
                if let Some(command) = self.manager.reset_all() {
                    self.enqueue_command(command);
                }
            }
            KeyCode::Char('t') => self.theme = self.theme.toggled(),
            KeyCode::Char('T') => self.theme = self.theme.next_accent(),
            KeyCode::Char('q') => self.should_quit = true,
            _ => {}
        }
    }

    fn handle_category_list_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected_category = self.selected_category.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                let last = self.categories.categories().len().saturating_sub(1);
                if self.selected_category < last {
                    self.selected_category += 1;
                }
            }
            KeyCode::Char('n') => {
                self.mode = Mode::NewCategory;
                self.clear_input();
            }
            KeyCode::Char('e') => {
                if let Some(category) =
                    self.categories.categories().get(self.selected_category)
                {
                    self.mode = Mode::EditingCategory(category.id);
                    self.input = category.name.clone();
                    self.cursor_position = self.input.chars().count();
                }
            }
            KeyCode::Char('d') => self.delete_selected_category(),
            KeyCode::Char('t') => self.theme = self.theme.toggled(),
            KeyCode::Char('T') => self.theme = self.theme.next_accent(),
            KeyCode::Char('q') => self.should_quit = true,
            _ => {}
        }
    }

    // -- mutations ---------------------------------------------------------

    fn submit_new_task(&mut self) {
        if self.input.trim().is_empty() {
            return;
        }
        match self.manager.add_task(&self.input.clone(), None) {
            Ok((_, command)) => {
                self.enqueue_command(command);
                self.clear_input();
            }
            Err(e) => self.notice = Some(e.to_string()),
        }
    }

    fn submit_draft(&mut self) {
        let draft = self.input.clone();
        let result = match self.mode {
            Mode::EditingTask(id) => match self.manager.edit_task_text(id, &draft) {
                Ok(command) => {
                    self.enqueue_command(command);
                    Ok(())
                }
                Err(e) => Err(e.to_string()),
            },
            Mode::EditingCategory(id) => match self.categories.rename(id, &draft) {
                Ok(plan) => {
                    self.enqueue_category_plan(plan);
                    Ok(())
                }
                Err(e) => Err(e.to_string()),
            },
            Mode::NewCategory => match self.categories.create(&draft, None) {
                Ok((_, plan)) => {
                    self.enqueue_category_plan(plan);
                    Ok(())
                }
                Err(e) => Err(e.to_string()),
            },
            Mode::Normal | Mode::Move | Mode::ConfirmDelete(_) => Ok(()),
        };
        match result {
            Ok(()) => {
                self.clear_input();
                self.mode = Mode::Normal;
            }
            Err(message) => self.notice = Some(message),
        }
    }

    fn toggle_selected_task(&mut self) {
        let Some(task) = self.manager.tasks().get(self.selected_task) else {
            return;
        };
        match self.manager.toggle_task(task.id) {
            Ok(command) => self.enqueue_command(command),
            Err(e) => self.notice = Some(e.to_string()),
        }
    }

    fn move_selected_task(&mut self, delta: isize) {
        let Some(task) = self.manager.tasks().get(self.selected_task) else {
            return;
        };
        let Some(target) = self.selected_task.checked_add_signed(delta) else {
            return;
        };
        if target >= self.manager.tasks().len() {
            return;
        }
        match self.manager.move_task(task.id, target) {
            Ok(MoveOutcome::Moved(command)) => {
                self.enqueue_command(command);
                self.selected_task = target;
            }
            Ok(MoveOutcome::Rejected) => {
                self.notice = Some("move not allowed here".to_string());
            }
            Err(e) => self.notice = Some(e.to_string()),
        }
    }

    /// Cycles the selected task through no category and each category in
    /// turn.
    fn cycle_selected_task_category(&mut self) {
        let Some(task) = self.manager.tasks().get(self.selected_task) else {
            return;
        };
        let ids: Vec<CategoryId> = self.categories.categories().iter().map(|c| c.id).collect();
        if ids.is_empty() {
            self.notice = Some("no categories yet".to_string());
            return;
        }
        let next = match task.category_id {
            None => Some(ids[0]),
            Some(current) => ids
                .iter()
                .position(|id| *id == current)
                .and_then(|pos| ids.get(pos + 1).copied()),
        };
        let id = task.id;
        match self.manager.assign_category(id, next) {
            Ok(command) => self.enqueue_command(command),
            Err(e) => self.notice = Some(e.to_string()),
        }
    }

    fn delete_selected_category(&mut self) {
        let Some(category) = self.categories.categories().get(self.selected_category) else {
            return;
        };
        let id = category.id;
        match self.categories.delete(id) {
            Ok(plan) => {
                self.enqueue_category_plan(plan);
                self.clamp_selection();
            }
            Err(e) => self.notice = Some(e.to_string()),
        }
    }

    // -- write queue -------------------------------------------------------

    fn mint_job(&mut self) -> JobId {
        self.next_job += 1;
        JobId::new(self.next_job)
    }

    fn enqueue_command(&mut self, command: CommandId) {
        if let Some(plan) = self.manager.write_plan(command).cloned() {
            let job = self.mint_job();
            self.jobs.push_back(WriteJob {
                job,
                command: Some(command),
                plan,
            });
        }
    }

    fn enqueue_category_plan(&mut self, plan: WritePlan) {
        let job = self.mint_job();
        self.jobs.push_back(WriteJob {
            job,
            command: None,
            plan,
        });
    }

    fn on_write_failed(&mut self, job: JobId, reason: &str) {
        let Some((in_flight, command)) = self.in_flight.take() else {
            return;
        };
        if in_flight != job {
            self.in_flight = Some((in_flight, command));
            return;
        }
        let Some(command) = command else {
            // Category write: local state is corrected by the next snapshot.
            self.notice = Some(format!("category write failed: {reason}"));
            return;
        };
        let report = self.manager.reject(command);
        // Rewrite the unsent queue to match the rollback: surviving task
        // commands get their regenerated plans, dropped ones disappear.
        let mut rebuilt = VecDeque::with_capacity(self.jobs.len());
        for entry in self.jobs.drain(..) {
            match entry.command {
                Some(cmd) if report.dropped.contains(&cmd) => {}
                Some(cmd) => {
                    if let Some((_, plan)) =
                        report.reapplied.iter().find(|(id, _)| *id == cmd)
                    {
                        rebuilt.push_back(WriteJob {
                            job: entry.job,
                            command: entry.command,
                            plan: plan.clone(),
                        });
                    } else {
                        rebuilt.push_back(entry);
                    }
                }
                None => rebuilt.push_back(entry),
            }
        }
        self.jobs = rebuilt;
        self.notice = Some(format!("change rolled back: {reason}"));
        self.clamp_selection();
    }

    fn maybe_seed(&mut self) {
        if self.seeded || !self.seed_defaults || self.user.is_none() {
            return;
        }
        if !self.manager.tasks().is_empty() {
            self.seeded = true;
            return;
        }
        self.seeded = true;
        for command in self.manager.seed_defaults() {
            self.enqueue_command(command);
        }
    }

    // -- small helpers -----------------------------------------------------

    fn clamp_selection(&mut self) {
        let last_task = self.manager.tasks().len().saturating_sub(1);
        self.selected_task = self.selected_task.min(last_task);
        let last_category = self.categories.categories().len().saturating_sub(1);
        self.selected_category = self.selected_category.min(last_category);
    }

    fn clear_input(&mut self) {
        self.input.clear();
        self.cursor_position = 0;
    }

    fn enter_char(&mut self, c: char) {
        let byte_index = self.byte_index();
        self.input.insert(byte_index, c);
        self.cursor_position += 1;
    }

    fn delete_char(&mut self) {
        if self.cursor_position == 0 {
            return;
        }
        self.cursor_position -= 1;
        let byte_index = self.byte_index();
        self.input.remove(byte_index);
    }

    const fn move_cursor_left(&mut self) {
        if self.cursor_position > 0 {
            self.cursor_position -= 1;
        }
    }

    fn move_cursor_right(&mut self) {
        if self.cursor_position < self.input.chars().count() {
            self.cursor_position += 1;
        }
    }

    /// Byte offset of the character cursor.
    fn byte_index(&self) -> usize {
        self.input
            .char_indices()
            .map(|(i, _)| i)
            .nth(self.cursor_position)
            .unwrap_or(self.input.len())
    }

    const fn cycle_focus_forward(&mut self) {
        self.focus = match self.focus {
            PanelFocus::Input => PanelFocus::Checklist,
            PanelFocus::Checklist => PanelFocus::Categories,
            PanelFocus::Categories => PanelFocus::Input,
        };
    }

    const fn cycle_focus_backward(&mut self) {
        self.focus = match self.focus {
            PanelFocus::Input => PanelFocus::Categories,
            PanelFocus::Categories => PanelFocus::Checklist,
            PanelFocus::Checklist => PanelFocus::Input,
        };
    }
}
