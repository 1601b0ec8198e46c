//! The fixed primitive set. `PRIM_TABLE` is the packed name table the
//! dictionary is bootstrapped from: each entry's name is what
//! [`crate::vm::Vm::bootstrap`] adds to the dictionary, stripped of the
//! leading underscore that marks an immediate primitive here.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Prim {
    Exit = 0,
    Lit,
    Ltz,
    Col,
    Semicol,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Drop,
    Dup,
    Pickr,
    Immediate,
    Peek,
    Poke,
    Swap,
    Rot,
    Jmp,
    Jmp0,
    Tick,
    Comment,
    Pushr,
    Popr,
    Equal,
    Sys,
    Pick,
    Comma,
    Key,
    Lits,
    Len,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    Emit,
    Devread,
    Devwrite,
    Devtemp,
    Devvdd,
}

pub const PRIM_COUNT: usize = 41;

impl Prim {
    pub fn from_code(code: i32) -> Option<Prim> {
        use Prim::*;
        Some(match code {
            0 => Exit,
            1 => Lit,
            2 => Ltz,
            3 => Col,
            4 => Semicol,
            5 => Add,
            6 => Sub,
            7 => Mul,
            8 => Div,
            9 => Mod,
            10 => Drop,
            11 => Dup,
            12 => Pickr,
            13 => Immediate,
            14 => Peek,
            15 => Poke,
            16 => Swap,
            17 => Rot,
            18 => Jmp,
            19 => Jmp0,
            20 => Tick,
            21 => Comment,
            22 => Pushr,
            23 => Popr,
            24 => Equal,
            25 => Sys,
            26 => Pick,
            27 => Comma,
            28 => Key,
            29 => Lits,
            30 => Len,
            31 => And,
            32 => Or,
            33 => Xor,
            34 => Shl,
            35 => Shr,
            36 => Emit,
            37 => Devread,
            38 => Devwrite,
            39 => Devtemp,
            40 => Devvdd,
            _ => return None,
        })
    }
}

/// `(primitive, bootstrap name, is immediate)`. Order matches the numeric
/// opcode each primitive is dispatched on, and must stay in lockstep with
/// [`Prim::from_code`].
pub const PRIM_TABLE: &[(Prim, &str, bool)] = &[
    (Prim::Exit, "exit", false),
    (Prim::Lit, "lit", false),
    (Prim::Ltz, "<0", false),
    (Prim::Col, ":", false),
    (Prim::Semicol, ";", true),
    (Prim::Add, "+", false),
    (Prim::Sub, "-", false),
    (Prim::Mul, "*", false),
    (Prim::Div, "/", false),
    (Prim::Mod, "%", false),
    (Prim::Drop, "drop", false),
    (Prim::Dup, "dup", false),
    (Prim::Pickr, "pickr", false),
    (Prim::Immediate, "immediate", true),
    (Prim::Peek, "@@", false),
    (Prim::Poke, "!!", false),
    (Prim::Swap, "swap", false),
    (Prim::Rot, "rot", false),
    (Prim::Jmp, "jmp", false),
    (Prim::Jmp0, "jmp0", false),
    (Prim::Tick, "'", false),
    (Prim::Comment, "(", true),
    (Prim::Pushr, ">r", false),
    (Prim::Popr, "r>", false),
    (Prim::Equal, "=", false),
    (Prim::Sys, "sys", false),
    (Prim::Pick, "pick", false),
    (Prim::Comma, ",,", false),
    (Prim::Key, "key", false),
    (Prim::Lits, "lits", false),
    (Prim::Len, "##", false),
    (Prim::And, "&", false),
    (Prim::Or, "|", false),
    (Prim::Xor, "^", false),
    (Prim::Shl, "<<", false),
    (Prim::Shr, ">>", false),
    (Prim::Emit, ".", false),
    (Prim::Devread, "@D", false),
    (Prim::Devwrite, "!D", false),
    (Prim::Devtemp, "@T", false),
    (Prim::Devvdd, "@V", false),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_length_matches_prim_count() {
        assert_eq!(PRIM_TABLE.len(), PRIM_COUNT);
    }

    #[test]
    fn from_code_round_trips_table_order() {
        for (i, (prim, _, _)) in PRIM_TABLE.iter().enumerate() {
            assert_eq!(Prim::from_code(i as i32), Some(*prim));
        }
        assert_eq!(Prim::from_code(PRIM_COUNT as i32), None);
    }
}
