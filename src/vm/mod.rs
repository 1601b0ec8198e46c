//! Stack-based bytecode interpreter ("the VM"): a dictionary of
//! user-defined and primitive words, two stacks, and an inner
//! interpreter that threads through compiled cell sequences. Host code
//! only ever calls [`Vm::eval`]; everything else is internal machinery.
//!
//! This is a from-scratch Rust port of a classic small-footprint
//! threaded Forth (the kind with a packed primitive name table and a
//! `std_lib` bootstrap string written in itself). The abort/recovery
//! model is the one deliberate departure: the original unwinds a
//! `setjmp`/`longjmp` pair back to `zf_eval`'s entry; here every
//! fallible operation returns `Result<_, Abort>` and `?` unwinds the
//! Rust call stack instead, with the same net effect (stacks and compile
//! state reset, reason code returned).

pub mod cell;
pub mod parse;
pub mod prim;
pub mod stdlib;

use crate::config::{DICT_SIZE, DSTACK_SIZE, RSTACK_SIZE, USERVAR_COUNT, WORD_BUF_SIZE};
use crate::mem::MemorySurface;
use crate::sensors::SensorSource;

pub use cell::Size;
pub use prim::Prim;

const IMMEDIATE_FLAG: i32 = 1 << 6;
const PRIM_FLAG: i32 = 1 << 5;

/// Reasons a primitive can abort evaluation. `0` (not a variant here) is
/// reserved for "no abort" at the [`Vm::eval`] call site, matching the
/// original's `ZF_OK`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Abort {
    InternalError = 1,
    OutsideMem = 2,
    DstackUnderrun = 3,
    DstackOverrun = 4,
    RstackUnderrun = 5,
    RstackOverrun = 6,
    NotAWord = 7,
    CompileOnlyWord = 8,
    InvalidSize = 9,
    DivisionByZero = 10,
    InvalidUservar = 11,
    External = 12,
}

impl Abort {
    pub fn code(self) -> u32 {
        self as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputState {
    Interpret,
    PassChar,
    PassWord,
}

/// External collaborators a running word may touch: the memory surface
/// behind `@D`/`!D`/`.` and the latched sensor sample behind `@T`/`@V`.
pub struct Io<'a> {
    pub mem: &'a mut MemorySurface,
    pub sensors: &'a dyn SensorSource,
}

struct NullSensors;
impl SensorSource for NullSensors {
    fn sample(&self) -> (u16, u16) {
        (0, 0)
    }
}

pub struct Vm {
    dict: [u8; DICT_SIZE],
    dstack: [i32; DSTACK_SIZE],
    rstack: [i32; RSTACK_SIZE],
    dsp: usize,
    rsp: usize,
    ip: usize,
    here: usize,
    latest: usize,
    trace: i32,
    compiling: bool,
    postpone: bool,
    input_state: InputState,
    word_buf: heapless::Vec<u8, WORD_BUF_SIZE>,
}

impl Vm {
    /// A freshly bootstrapped interpreter: every primitive and user
    /// variable dictionary word added, `std_lib` evaluated.
    pub fn new() -> Vm {
        let mut vm = Vm {
            dict: [0; DICT_SIZE],
            dstack: [0; DSTACK_SIZE],
            rstack: [0; RSTACK_SIZE],
            dsp: 0,
            rsp: 0,
            ip: 0,
            here: 0,
            latest: 0,
            trace: 0,
            compiling: false,
            postpone: false,
            input_state: InputState::Interpret,
            word_buf: heapless::Vec::new(),
        };
        // infallible: DICT_SIZE is sized generously enough to hold every
        // primitive header plus std_lib's compiled form.
        vm.bootstrap()
            .expect("dictionary capacity too small for bootstrap");
        vm
    }

    /// Evaluate a NUL-terminated (or buffer-bounded) source string.
    /// Returns `0` on success, or the [`Abort`] reason code otherwise.
    /// On failure, compile state and both stacks are reset, matching
    /// `zf_eval`'s unwind-to-entry behavior.
    pub fn eval(&mut self, buf: &[u8], io: &mut Io) -> u32 {
        match self.try_eval(buf, io) {
            Ok(()) => 0,
            Err(e) => {
                self.compiling = false;
                self.postpone = false;
                self.dsp = 0;
                self.rsp = 0;
                self.input_state = InputState::Interpret;
                self.word_buf.clear();
                e.code()
            }
        }
    }

    /// Read a user variable (`h`, `latest`, `trace`, `compiling`,
    /// `_postpone`, indices 0..5) from the host side.
    pub fn uservar(&self, idx: usize) -> Result<i32, Abort> {
        match idx {
            0 => Ok(self.here as i32),
            1 => Ok(self.latest as i32),
            2 => Ok(self.trace),
            3 => Ok(self.compiling as i32),
            4 => Ok(self.postpone as i32),
            _ => Err(Abort::InvalidUservar),
        }
    }

    /// Write a user variable from the host side.
    pub fn set_uservar(&mut self, idx: usize, v: i32) -> Result<(), Abort> {
        match idx {
            0 => self.here = v as usize,
            1 => self.latest = v as usize,
            2 => self.trace = v,
            3 => self.compiling = v != 0,
            4 => self.postpone = v != 0,
            _ => return Err(Abort::InvalidUservar),
        }
        Ok(())
    }

    /// The raw dictionary image, for host-side inspection/tracing.
    pub fn dump_dict(&self) -> &[u8] {
        &self.dict
    }

    fn try_eval(&mut self, buf: &[u8], io: &mut Io) -> Result<(), Abort> {
        let mut i = 0;
        loop {
            let c = buf.get(i).copied().unwrap_or(0);
            self.handle_char(c, io)?;
            if c == 0 {
                return Ok(());
            }
            i += 1;
        }
    }

    fn bootstrap(&mut self) -> Result<(), Abort> {
        for (prim, name, immediate) in prim::PRIM_TABLE {
            self.add_prim(name.as_bytes(), *prim, *immediate);
        }
        for (idx, name) in ["h", "latest", "trace", "compiling", "_postpone"]
            .iter()
            .enumerate()
        {
            self.add_uservar(name.as_bytes(), idx as i32);
        }

        let mut scratch = MemorySurface::new();
        let sensors = NullSensors;
        let mut io = Io {
            mem: &mut scratch,
            sensors: &sensors,
        };
        self.try_eval(stdlib::STD_LIB.as_bytes(), &mut io)
    }

    // ---- stacks ----

    fn push(&mut self, v: i32) -> Result<(), Abort> {
        if self.dsp >= DSTACK_SIZE {
            return Err(Abort::DstackOverrun);
        }
        self.dstack[self.dsp] = v;
        self.dsp += 1;
        Ok(())
    }

    fn pop(&mut self) -> Result<i32, Abort> {
        if self.dsp == 0 {
            return Err(Abort::DstackUnderrun);
        }
        self.dsp -= 1;
        Ok(self.dstack[self.dsp])
    }

    fn pick(&self, n: usize) -> Result<i32, Abort> {
        if n >= self.dsp {
            return Err(Abort::DstackUnderrun);
        }
        Ok(self.dstack[self.dsp - n - 1])
    }

    fn pushr(&mut self, v: i32) -> Result<(), Abort> {
        if self.rsp >= RSTACK_SIZE {
            return Err(Abort::RstackOverrun);
        }
        self.rstack[self.rsp] = v;
        self.rsp += 1;
        Ok(())
    }

    fn popr(&mut self) -> Result<i32, Abort> {
        if self.rsp == 0 {
            return Err(Abort::RstackUnderrun);
        }
        self.rsp -= 1;
        Ok(self.rstack[self.rsp])
    }

    fn pickr(&self, n: usize) -> Result<i32, Abort> {
        if n >= self.rsp {
            return Err(Abort::RstackUnderrun);
        }
        Ok(self.rstack[self.rsp - n - 1])
    }

    // ---- dictionary ----

    fn get_cell(&self, addr: usize) -> (i32, usize) {
        cell::get_cell_typed(&self.dict, addr, Size::Var)
    }

    fn put_cell(&mut self, addr: usize, v: i32) -> usize {
        cell::put_cell_typed(&mut self.dict, addr, v, Size::Var)
    }

    fn get_cell_typed(&self, addr: usize, size: Size) -> (i32, usize) {
        cell::get_cell_typed(&self.dict, addr, size)
    }

    fn put_cell_typed(&mut self, addr: usize, v: i32, size: Size) -> usize {
        cell::put_cell_typed(&mut self.dict, addr, v, size)
    }

    fn add_cell_typed(&mut self, v: i32, size: Size) {
        let n = self.put_cell_typed(self.here, v, size);
        self.here += n;
    }

    fn add_cell(&mut self, v: i32) {
        self.add_cell_typed(v, Size::Var);
    }

    fn add_op(&mut self, op: i32) {
        self.add_cell(op);
    }

    fn add_lit(&mut self, v: i32) {
        self.add_op(Prim::Lit as i32);
        self.add_cell(v);
    }

    fn add_str(&mut self, s: &[u8]) {
        self.dict[self.here..self.here + s.len()].copy_from_slice(s);
        self.here += s.len();
    }

    fn create(&mut self, name: &[u8], flags: i32) {
        let here_prev = self.here;
        self.add_cell((name.len() as i32) | flags);
        self.add_cell(self.latest as i32);
        self.add_str(name);
        self.latest = here_prev;
    }

    fn find_word(&self, name: &[u8]) -> Option<(usize, usize)> {
        let mut w = self.latest;
        while w != 0 {
            let (d, l1) = self.get_cell(w);
            let p = w + l1;
            let (link, l2) = self.get_cell(p);
            let p = p + l2;
            let len = (d as usize) & 0x1f;
            if len == name.len() && &self.dict[p..p + len] == name {
                return Some((w, p + len));
            }
            w = link as usize;
        }
        None
    }

    fn make_immediate(&mut self) {
        let (lenflags, _) = self.get_cell(self.latest);
        self.put_cell(self.latest, lenflags | IMMEDIATE_FLAG);
    }

    fn add_prim(&mut self, name: &[u8], op: Prim, immediate: bool) {
        self.create(name, PRIM_FLAG);
        self.add_op(op as i32);
        self.add_op(Prim::Exit as i32);
        if immediate {
            self.make_immediate();
        }
    }

    fn add_uservar(&mut self, name: &[u8], addr: i32) {
        self.create(name, 0);
        self.add_lit(addr);
        self.add_op(Prim::Exit as i32);
    }

    fn peek(&self, addr: usize, size: i32) -> Result<(i32, usize), Abort> {
        if addr < USERVAR_COUNT {
            Ok((self.uservar(addr)?, 1))
        } else {
            let size = Size::from_code(size)?;
            Ok(self.get_cell_typed(addr, size))
        }
    }

    // ---- inner interpreter ----

    fn run(&mut self, mut input: Option<&[u8]>, io: &mut Io) -> Result<(), Abort> {
        while self.ip != 0 {
            let ip_org = self.ip;
            let (d, l) = self.get_cell(self.ip);
            self.ip += l;

            if d >= 0 && (d as usize) <= prim::PRIM_COUNT {
                let prim = Prim::from_code(d).ok_or(Abort::InternalError)?;
                self.do_prim(prim, input, io)?;

                if self.input_state != InputState::Interpret {
                    self.ip = ip_org;
                    break;
                }
            } else {
                self.pushr(self.ip as i32)?;
                self.ip = d as usize;
            }
            input = None;
        }
        Ok(())
    }

    fn execute(&mut self, addr: usize, io: &mut Io) -> Result<(), Abort> {
        self.ip = addr;
        self.rsp = 0;
        self.pushr(0)?;
        self.run(None, io)
    }

    fn handle_word(&mut self, word: &[u8], io: &mut Io) -> Result<(), Abort> {
        if self.input_state == InputState::PassWord {
            self.input_state = InputState::Interpret;
            return self.run(Some(word), io);
        }

        if let Some((w, c)) = self.find_word(word) {
            let (flags, _) = self.get_cell(w);
            let immediate = flags & IMMEDIATE_FLAG != 0;
            let is_prim = flags & PRIM_FLAG != 0;

            if self.compiling && (self.postpone || !immediate) {
                if is_prim {
                    let (op, _) = self.get_cell(c);
                    self.add_op(op);
                } else {
                    self.add_op(c as i32);
                }
                self.postpone = false;
                Ok(())
            } else {
                self.execute(c, io)
            }
        } else {
            let v = parse::parse_num(word)?;
            if self.compiling {
                self.add_lit(v);
            } else {
                self.push(v)?;
            }
            Ok(())
        }
    }

    fn handle_char(&mut self, c: u8, io: &mut Io) -> Result<(), Abort> {
        if self.input_state == InputState::PassChar {
            self.input_state = InputState::Interpret;
            let cbuf = [c];
            return self.run(Some(&cbuf), io);
        }

        if c != 0 && !c.is_ascii_whitespace() {
            if self.word_buf.len() < WORD_BUF_SIZE - 1 {
                // capacity enforced by the check above; never fails.
                let _ = self.word_buf.push(c);
            }
            Ok(())
        } else if !self.word_buf.is_empty() {
            let word = core::mem::take(&mut self.word_buf);
            self.handle_word(&word, io)
        } else {
            Ok(())
        }
    }

    fn do_prim(&mut self, op: Prim, input: Option<&[u8]>, io: &mut Io) -> Result<(), Abort> {
        use Prim::*;

        match op {
            Col => match input {
                None => self.input_state = InputState::PassWord,
                Some(word) => {
                    self.create(word, 0);
                    self.compiling = true;
                }
            },
            Ltz => {
                let v = self.pop()?;
                self.push((v < 0) as i32)?;
            }
            Semicol => {
                self.add_op(Prim::Exit as i32);
                self.compiling = false;
            }
            Lit => {
                let (v, l) = self.get_cell(self.ip);
                self.ip += l;
                self.push(v)?;
            }
            Exit => {
                self.ip = self.popr()? as usize;
            }
            Len => {
                let size = self.pop()?;
                let addr = self.pop()?;
                let (_, len) = self.peek(addr as usize, size)?;
                self.push(len as i32)?;
            }
            Peek => {
                let size = self.pop()?;
                let addr = self.pop()?;
                let (v, _) = self.peek(addr as usize, size)?;
                self.push(v)?;
            }
            Poke => {
                let size = self.pop()?;
                let addr = self.pop()?;
                let v = self.pop()?;
                if (addr as usize) < USERVAR_COUNT {
                    self.set_uservar(addr as usize, v)?;
                } else {
                    let size = Size::from_code(size)?;
                    self.put_cell_typed(addr as usize, v, size);
                }
            }
            Swap => {
                let a = self.pop()?;
                let b = self.pop()?;
                self.push(a)?;
                self.push(b)?;
            }
            Rot => {
                let a = self.pop()?;
                let b = self.pop()?;
                let c = self.pop()?;
                self.push(b)?;
                self.push(a)?;
                self.push(c)?;
            }
            Drop => {
                self.pop()?;
            }
            Dup => {
                let v = self.pop()?;
                self.push(v)?;
                self.push(v)?;
            }
            Add => {
                let a = self.pop()?;
                let b = self.pop()?;
                self.push(a.wrapping_add(b))?;
            }
            Pick => {
                let n = self.pop()?;
                let v = self.pick(n as usize)?;
                self.push(v)?;
            }
            Pickr => {
                let n = self.pop()?;
                let v = self.pickr(n as usize)?;
                self.push(v)?;
            }
            Sub => {
                let a = self.pop()?;
                let b = self.pop()?;
                self.push(b.wrapping_sub(a))?;
            }
            Mul => {
                let a = self.pop()?;
                let b = self.pop()?;
                self.push(a.wrapping_mul(b))?;
            }
            Div => {
                let divisor = self.pop()?;
                if divisor == 0 {
                    return Err(Abort::DivisionByZero);
                }
                let dividend = self.pop()?;
                self.push(dividend.wrapping_div(divisor))?;
            }
            Mod => {
                let divisor = self.pop()?;
                if divisor == 0 {
                    return Err(Abort::DivisionByZero);
                }
                let dividend = self.pop()?;
                self.push(dividend.wrapping_rem(divisor))?;
            }
            Immediate => self.make_immediate(),
            Jmp => {
                let (target, l) = self.get_cell(self.ip);
                self.ip += l;
                self.ip = target as usize;
            }
            Jmp0 => {
                let (target, l) = self.get_cell(self.ip);
                self.ip += l;
                if self.pop()? == 0 {
                    self.ip = target as usize;
                }
            }
            Tick => {
                if self.compiling {
                    let (v, l) = self.get_cell(self.ip);
                    self.ip += l;
                    self.push(v)?;
                } else {
                    match input {
                        Some(word) => {
                            let (_, code) = self.find_word(word).ok_or(Abort::InternalError)?;
                            self.push(code as i32)?;
                        }
                        None => self.input_state = InputState::PassWord,
                    }
                }
            }
            Comma => {
                let size = self.pop()?;
                let v = self.pop()?;
                let size = Size::from_code(size)?;
                self.add_cell_typed(v, size);
            }
            Comment => match input {
                Some(c) if c.first() == Some(&b')') => {}
                _ => self.input_state = InputState::PassChar,
            },
            Pushr => {
                let v = self.pop()?;
                self.pushr(v)?;
            }
            Popr => {
                let v = self.popr()?;
                self.push(v)?;
            }
            Equal => {
                let a = self.pop()?;
                let b = self.pop()?;
                self.push((a == b) as i32)?;
            }
            Sys => {
                // reserved for host syscalls; no syscall table is wired
                // up to the chain protocol.
            }
            Key => match input {
                None => self.input_state = InputState::PassChar,
                Some(c) => self.push(c[0] as i32)?,
            },
            Lits => {
                let (len, l) = self.get_cell(self.ip);
                self.ip += l;
                self.push(self.ip as i32)?;
                self.push(len)?;
                self.ip += len as usize;
            }
            And => {
                let a = self.pop()?;
                let b = self.pop()?;
                self.push(a & b)?;
            }
            Or => {
                let a = self.pop()?;
                let b = self.pop()?;
                self.push(a | b)?;
            }
            Xor => {
                let a = self.pop()?;
                let b = self.pop()?;
                self.push(a ^ b)?;
            }
            Shl => {
                let n = self.pop()?;
                let v = self.pop()?;
                self.push(v.wrapping_shl((n & 31) as u32))?;
            }
            Shr => {
                let n = self.pop()?;
                let v = self.pop()?;
                self.push(v.wrapping_shr((n & 31) as u32))?;
            }
            Emit => {
                let v = self.pop()?;
                io.mem.emit_cell(v);
            }
            Devread => {
                let off = self.pop()?;
                self.push(io.mem.dev_read(off) as i32)?;
            }
            Devwrite => {
                let off = self.pop()?;
                let v = self.pop()?;
                io.mem.dev_write(off, v as u8);
            }
            Devtemp => {
                let (temp, _vdd) = io.sensors.sample();
                self.push(temp as i32)?;
            }
            Devvdd => {
                let (_temp, vdd) = io.sensors.sample();
                self.push(vdd as i32)?;
            }
        }
        Ok(())
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}
