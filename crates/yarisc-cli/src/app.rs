//! Interactive debugger session.

use std::io::{self, BufRead as _, Write as _};
use std::path::Path;

use yarisc_core::{
    render_debugger_view, Debugger, DebuggerView, ExecutionMode, Machine, MemoryView,
    OutputFormat, RegistersView,
};

const INFO_MESSAGE: &str = "Type 'h' for a list of commands";
const HELP_MESSAGE: &str =
    "Commands: h: help, hh: more help, e: exit, r: reset, l <path>: load image";
const MORE_HELP_MESSAGE: &str = "Commands: s: single step, x: execute";
const FINISHED_MESSAGE: &str = "Program has finished";

/// Base address of the memory window shown by the session.
const MEMORY_DEBUG_BASE: usize = 0;
/// Size in bytes of the memory window shown by the session.
const MEMORY_DEBUG_SIZE: usize = 256;

/// Interactive session around a machine with an attached debugger.
pub struct Session {
    machine: Machine,
    mode: ExecutionMode,
    format: OutputFormat,

    finished: bool,
    clear_display: bool,

    info: String,
    error: String,

    previous_registers: RegistersView,
    previous_memory: Option<Vec<u8>>,
}

impl Session {
    /// Creates a session around the given machine.
    pub fn new(machine: Machine, mode: ExecutionMode, format: OutputFormat) -> Self {
        let previous_registers = machine.state_view();

        Self {
            machine,
            mode,
            format,
            finished: false,
            clear_display: true,
            info: String::new(),
            error: String::new(),
            previous_registers,
            previous_memory: None,
        }
    }

    /// Runs the command loop until the user exits.
    ///
    /// # Errors
    ///
    /// Returns the error when reading from or writing to the terminal fails.
    pub fn run(&mut self) -> io::Result<()> {
        let stdin = io::stdin();
        let mut line = String::new();

        loop {
            self.display()?;

            let mut out = io::stdout();
            write!(out, "\n$ ")?;
            out.flush()?;

            line.clear();
            if stdin.lock().read_line(&mut line)? == 0 {
                break;
            }

            if self.handle_command(line.trim()) {
                self.display()?;
                break;
            }
        }

        Ok(())
    }

    fn display(&mut self) -> io::Result<()> {
        let current_registers = self.machine.state_view();
        let current_memory = self
            .machine
            .memory_view(MEMORY_DEBUG_BASE, MEMORY_DEBUG_SIZE)
            .expect("the debug window base is aligned and in range");

        let previous_memory = self.previous_memory.as_ref().map(|bytes| {
            MemoryView::new(
                bytes,
                MEMORY_DEBUG_BASE as u16,
                Some(&self.previous_registers.reg),
            )
            .expect("the captured window is aligned")
        });

        let info = if self.info.is_empty() && self.error.is_empty() {
            INFO_MESSAGE
        } else {
            &self.info
        };

        let view = DebuggerView {
            current_registers,
            current_memory,
            previous_registers: self.previous_registers,
            previous_memory,
            info,
            error: &self.error,
        };

        // Accumulate everything in one string and write it at once
        let mut text = String::new();
        if self.format == OutputFormat::Colored {
            text.push_str(if self.clear_display {
                "\x1b[H\x1b[2J"
            } else {
                "\x1b[H"
            });
        }
        text.push_str(&render_debugger_view(&view, self.machine.level(), self.format));

        let mut out = io::stdout();
        out.write_all(text.as_bytes())?;
        out.flush()?;

        self.clear_display = false;

        Ok(())
    }

    /// Handles one command line; returns true when the session should end.
    fn handle_command(&mut self, command: &str) -> bool {
        self.reset_messages();

        match command {
            "" => {}
            "h" => self.info = HELP_MESSAGE.to_string(),
            "hh" => self.info = MORE_HELP_MESSAGE.to_string(),
            "e" => return true,
            "s" => self.execute(Some(1)),
            "x" => self.execute(None),
            "r" => self.reset_machine(None),
            "l" => self.error = String::from("Load command expects an image file path: l path/to/image"),
            _ => {
                if let Some(path) = command.strip_prefix("l ") {
                    self.reset_machine(Some(path));
                } else {
                    self.error = format!("Unknown command: {command}");
                }
            }
        }

        false
    }

    fn execute(&mut self, steps: Option<u64>) {
        if self.finished {
            self.error = FINISHED_MESSAGE.to_string();
            return;
        }

        self.capture_state();

        let halted = match steps {
            Some(steps) => self
                .machine
                .execute_steps(steps, self.mode)
                .map(|(halted, _)| halted),
            None => self.machine.execute(self.mode),
        };

        match halted {
            Ok(halted) => {
                let panicked = self.machine.debugger().map_or(false, Debugger::is_panic);
                self.finished = halted || panicked;
            }
            Err(error) => {
                self.error = format!("Error: {error}");
                self.finished = true;
            }
        }

        self.update_messages();
    }

    fn update_messages(&mut self) {
        if let Some(debugger) = self.machine.debugger_mut() {
            if debugger.is_panic() {
                // Keep the panic message latched on the debugger
                self.error = debugger.message().to_string();
            } else if self.info.is_empty() && !debugger.message().is_empty() {
                self.info = debugger.message().to_string();
                debugger.reset_message();
            }
        }

        if self.finished && self.info.is_empty() && self.error.is_empty() {
            self.info = FINISHED_MESSAGE.to_string();
        }
    }

    fn reset_messages(&mut self) {
        self.info.clear();
        self.error.clear();
    }

    fn capture_state(&mut self) {
        self.previous_registers = self.machine.state_view();

        let window = self
            .machine
            .memory_view(MEMORY_DEBUG_BASE, MEMORY_DEBUG_SIZE)
            .expect("the debug window base is aligned and in range");
        self.previous_memory = Some(window.data().to_vec());
    }

    fn reset_machine(&mut self, image: Option<&str>) {
        self.machine.reset();
        self.finished = false;
        self.clear_display = true;
        self.previous_registers = self.machine.state_view();
        self.previous_memory = None;

        let Some(path) = image else {
            self.info = String::from("Reset to initial state");
            return;
        };

        if path.is_empty() {
            self.error = String::from("No image file given");
            return;
        }

        match self.machine.load(Path::new(path)) {
            Ok(()) => self.info = format!("Image {path} loaded successfully"),
            Err(error) => self.error = format!("Error: {error}"),
        }
    }
}
