use std::env;
use std::io::{self, IsTerminal, Write};
use std::sync::{Mutex, OnceLock};
use std::thread;
use std::time::{Duration, Instant};

const PROGRESS_ENV: &str = "WHEELHOUSE_PROGRESS";

fn progress_enabled() -> bool {
    match env::var(PROGRESS_ENV) {
        Ok(value) => value != "0",
        Err(_) => io::stderr().is_terminal(),
    }
}

static OUTPUT_LOCK: Mutex<()> = Mutex::new(());
static MANAGER: OnceLock<ProgressManager> = OnceLock::new();

fn manager() -> &'static ProgressManager {
    MANAGER.get_or_init(ProgressManager::new)
}

fn clear_progress_line() {
    let _guard = OUTPUT_LOCK.lock().ok();
    let _ = io::stderr().write_all(b"\r\x1b[2K");
    let _ = io::stderr().flush();
}

#[derive(Clone)]
struct ProgressTask {
    id: u64,
    label: String,
    total: Option<usize>,
    current: usize,
    started_at: Instant,
}

struct ProgressManager {
    state: Mutex<ProgressState>,
}

struct ProgressState {
    next_id: u64,
    tasks: Vec<ProgressTask>,
    renderer_started: bool,
}

impl ProgressManager {
    fn new() -> Self {
        Self {
            state: Mutex::new(ProgressState {
                next_id: 1,
                tasks: Vec::new(),
                renderer_started: false,
            }),
        }
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut ProgressState) -> T) -> T {
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut state)
    }

    fn start_renderer(&self) {
        let start =
            self.with_state(|state| !std::mem::replace(&mut state.renderer_started, true));
        if !start {
            return;
        }

        thread::spawn(|| {
            const FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
            const TICK: Duration = Duration::from_millis(80);
            const START_DELAY: Duration = Duration::from_millis(120);
            let mut idx = 0usize;
            let mut rendered = false;
            loop {
                let task = manager().with_state(|state| state.tasks.last().cloned());
                let visible = task.filter(|task| {
                    Instant::now().saturating_duration_since(task.started_at) >= START_DELAY
                });
                let Some(task) = visible else {
                    if rendered {
                        clear_progress_line();
                        rendered = false;
                    }
                    thread::sleep(TICK);
                    continue;
                };

                let frame = FRAMES[idx % FRAMES.len()];
                idx = idx.wrapping_add(1);
                let line = match task.total {
                    Some(total) => {
                        let current = task.current.min(total);
                        format!(
                            "\r\x1b[2Kwheelhouse ▸ {} [{current}/{total}] {frame}",
                            task.label
                        )
                    }
                    None => format!("\r\x1b[2Kwheelhouse ▸ {} {frame}", task.label),
                };
                {
                    let _guard = OUTPUT_LOCK.lock().ok();
                    let _ = io::stderr().write_all(line.as_bytes());
                    let _ = io::stderr().flush();
                }
                rendered = true;
                thread::sleep(TICK);
            }
        });
    }

    fn push_task(&self, label: String, total: Option<usize>) -> u64 {
        self.with_state(|state| {
            let id = state.next_id;
            state.next_id = state.next_id.saturating_add(1);
            state.tasks.push(ProgressTask {
                id,
                label,
                total,
                current: 0,
                started_at: Instant::now(),
            });
            id
        })
    }

    fn update(&self, id: u64, delta: usize, label: Option<String>) {
        self.with_state(|state| {
            if let Some(task) = state.tasks.iter_mut().find(|task| task.id == id) {
                task.current = task.current.saturating_add(delta);
                if let Some(label) = label {
                    task.label = label;
                }
            }
        });
    }

    fn remove_task(&self, id: u64) {
        self.with_state(|state| state.tasks.retain(|task| task.id != id));
    }
}

/// Spinner or counted bar on stderr; a no-op when stderr is not a terminal
/// or `WHEELHOUSE_PROGRESS=0`.
pub struct ProgressReporter {
    id: Option<u64>,
}

impl ProgressReporter {
    pub fn spinner(label: impl Into<String>) -> Self {
        Self::start(label, None)
    }

    pub fn bar(label: impl Into<String>, total: usize) -> Self {
        if total == 0 {
            return Self::spinner(label);
        }
        Self::start(label, Some(total))
    }

    fn start(label: impl Into<String>, total: Option<usize>) -> Self {
        if !progress_enabled() {
            return Self { id: None };
        }
        manager().start_renderer();
        let id = manager().push_task(label.into(), total);
        Self { id: Some(id) }
    }

    pub fn increment(&self) {
        if let Some(id) = self.id {
            manager().update(id, 1, None);
        }
    }

    pub fn set_label(&self, label: impl Into<String>) {
        if let Some(id) = self.id {
            manager().update(id, 0, Some(label.into()));
        }
    }

    pub fn finish(mut self, message: impl Into<String>) {
        let was_enabled = self.id.is_some();
        self.stop();
        if was_enabled {
            eprintln!("wheelhouse ▸ {}", message.into());
        }
    }

    fn stop(&mut self) {
        if let Some(id) = self.id.take() {
            manager().remove_task(id);
            clear_progress_line();
        }
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        self.stop();
    }
}
