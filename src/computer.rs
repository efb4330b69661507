use std::fmt::Write as FmtWrite;
use std::thread;
use std::time::{Duration, Instant};

use crate::cpu::{Cpu, CpuError};
use crate::enums::RegisterId;
use crate::memory::ImageError;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ExitCode {
    Halted,          // HLT instruction was executed (normal shutdown)
    InvalidOpcode,   // Instruction register held a value past the dispatch table
    InvalidRegister, // Operand named a register code past the register file
    CycleLimit,      // The optional safety cap on cycles was reached
}

/// The assembled machine: a CPU plus the run loop driving it.
///
/// The run loop cycles the CPU until it halts, a runtime fault stops it, or
/// the optional cycle limit is reached. With a clock limit set, each cycle
/// sleeps for the remainder of its `1/frequency` budget; a cycle that overran
/// the budget gets no sleep.
pub struct Computer {
    cpu: Cpu,
    clock_hz: u32,
    max_cycles: Option<u64>,
    total_runtime: Duration,
}

impl Computer {
    pub fn new() -> Computer {
        Computer {
            cpu: Cpu::new(),
            clock_hz: 0,
            max_cycles: None,
            total_runtime: Duration::from_secs(0),
        }
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Cpu {
        &mut self.cpu
    }

    /// Target clock frequency in Hertz; zero runs unthrottled.
    pub fn set_clock_hz(&mut self, clock_hz: u32) {
        self.clock_hz = clock_hz;
    }

    /// Safety cap on executed cycles; `None` runs until halt.
    pub fn set_max_cycles(&mut self, max_cycles: Option<u64>) {
        self.max_cycles = max_cycles;
    }

    pub fn total_runtime(&self) -> Duration {
        self.total_runtime
    }

    pub fn load_image(&mut self, image: &[u8]) -> Result<(), ImageError> {
        self.cpu.ram_mut().load_image(image)
    }

    /// Cycles the CPU until it stops, returning why it stopped.
    pub fn run(&mut self) -> ExitCode {
        let start = Instant::now();
        let exit_code = self.run_cycles();
        self.total_runtime = start.elapsed();
        exit_code
    }

    fn run_cycles(&mut self) -> ExitCode {
        loop {
            if self.cpu.halt() {
                return ExitCode::Halted;
            }

            if let Some(limit) = self.max_cycles {
                if self.cpu.cycle_counter() >= limit {
                    return ExitCode::CycleLimit;
                }
            }

            let cycle_start = Instant::now();
            let result = self.cpu.cycle();

            if self.clock_hz > 0 {
                let budget = Duration::from_secs_f64(1.0 / f64::from(self.clock_hz));
                // A cycle that took longer than its budget gets no sleep.
                if let Some(remainder) = budget.checked_sub(cycle_start.elapsed()) {
                    thread::sleep(remainder);
                }
            }

            if let Err(error) = result {
                return match error {
                    CpuError::InvalidOpcode(_) => ExitCode::InvalidOpcode,
                    CpuError::InvalidRegister(_) => ExitCode::InvalidRegister,
                };
            }
        }
    }

    /// Renders the post-run status table.
    pub fn status(&self) -> String {
        let cpu = &self.cpu;
        let mut out = String::new();

        let _ = writeln!(out, "-----------------------");
        let _ = writeln!(out, "execution took: {:?}", self.total_runtime);
        let _ = writeln!(out, "cycles: {}", cpu.cycle_counter());
        let _ = writeln!(out, "-----------------------");
        let _ = writeln!(out, "ax: {}", cpu.register(RegisterId::AX));
        let _ = writeln!(out, "bx: {}", cpu.register(RegisterId::BX));
        let _ = writeln!(out, "cx: {}", cpu.register(RegisterId::CX));
        let _ = writeln!(out, "dx: {}", cpu.register(RegisterId::DX));
        let _ = writeln!(out, "-----------------------");
        let _ = writeln!(out, "ac: {}", cpu.register(RegisterId::ACC));
        let _ = writeln!(out, "sr: {}", cpu.register(RegisterId::SR));
        let _ = writeln!(out, "pc: {}", cpu.program_counter());
        let _ = writeln!(out, "sp: {}", cpu.stack_pointer());
        let _ = write!(out, "-----------------------");

        out
    }

    /// Status table followed by the full RAM dump.
    pub fn status_with_ram(&self) -> String {
        format!("{}\nram:\n{}", self.status(), self.cpu.ram())
    }
}

impl Default for Computer {
    fn default() -> Computer {
        Computer::new()
    }
}
