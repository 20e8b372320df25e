use crate::operand::OperandKind;

/// LuaJIT 2.0 bytecode opcodes.
///
/// Each variant documents the instruction's effect on its operands. Tests
/// (`IsLt` through `IsF`) are always followed by a `Jmp` that is taken when
/// the test holds.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    /// ISLT: if A < D then JMP
    IsLt = 0,
    /// ISGE: if A >= D then JMP
    IsGe = 1,
    /// ISLE: if A <= D then JMP
    IsLe = 2,
    /// ISGT: if A > D then JMP
    IsGt = 3,
    /// ISEQV: if A == D then JMP
    IsEqV = 4,
    /// ISNEV: if A ~= D then JMP
    IsNeV = 5,
    /// ISEQS: if A == strings[D] then JMP
    IsEqS = 6,
    /// ISNES: if A ~= strings[D] then JMP
    IsNeS = 7,
    /// ISEQN: if A == numbers[D] then JMP
    IsEqN = 8,
    /// ISNEN: if A ~= numbers[D] then JMP
    IsNeN = 9,
    /// ISEQP: if A == pri(D) then JMP
    IsEqP = 10,
    /// ISNEP: if A ~= pri(D) then JMP
    IsNeP = 11,
    /// ISTC: if D then A = D; JMP
    IsTC = 12,
    /// ISFC: if not D then A = D; JMP
    IsFC = 13,
    /// IST: if D then JMP
    IsT = 14,
    /// ISF: if not D then JMP
    IsF = 15,
    /// MOV: A = D
    Mov = 16,
    /// NOT: A = not D
    Not = 17,
    /// UNM: A = -D
    Unm = 18,
    /// LEN: A = #D
    Len = 19,
    /// ADDVN: A = B + numbers[C]
    AddVN = 20,
    /// SUBVN: A = B - numbers[C]
    SubVN = 21,
    /// MULVN: A = B * numbers[C]
    MulVN = 22,
    /// DIVVN: A = B / numbers[C]
    DivVN = 23,
    /// MODVN: A = B % numbers[C]
    ModVN = 24,
    /// ADDNV: A = numbers[C] + B
    AddNV = 25,
    /// SUBNV: A = numbers[C] - B
    SubNV = 26,
    /// MULNV: A = numbers[C] * B
    MulNV = 27,
    /// DIVNV: A = numbers[C] / B
    DivNV = 28,
    /// MODNV: A = numbers[C] % B
    ModNV = 29,
    /// ADDVV: A = B + C
    AddVV = 30,
    /// SUBVV: A = B - C
    SubVV = 31,
    /// MULVV: A = B * C
    MulVV = 32,
    /// DIVVV: A = B / C
    DivVV = 33,
    /// MODVV: A = B % C
    ModVV = 34,
    /// POW: A = B ^ C
    Pow = 35,
    /// CAT: A = B .. ~ .. C
    Cat = 36,
    /// KSTR: A = strings[D]
    KStr = 37,
    /// KCDATA: A = cdata[D]
    KCData = 38,
    /// KSHORT: A = D (signed 16-bit literal)
    KShort = 39,
    /// KNUM: A = numbers[D]
    KNum = 40,
    /// KPRI: A = pri(D)
    KPri = 41,
    /// KNIL: A, ..., D = nil
    KNil = 42,
    /// UGET: A = upvalues[D]
    UGet = 43,
    /// USETV: upvalues[A] = D
    USetV = 44,
    /// USETS: upvalues[A] = strings[D]
    USetS = 45,
    /// USETN: upvalues[A] = numbers[D]
    USetN = 46,
    /// USETP: upvalues[A] = pri(D)
    USetP = 47,
    /// UCLO: close upvalues >= A; JMP D
    UClo = 48,
    /// FNEW: A = closure(prototypes[D])
    FNew = 49,
    /// TNEW: A = {} (D holds size hints)
    TNew = 50,
    /// TDUP: A = copy(tables[D])
    TDup = 51,
    /// GGET: A = _G[strings[D]]
    GGet = 52,
    /// GSET: _G[strings[D]] = A
    GSet = 53,
    /// TGETV: A = B[C]
    TGetV = 54,
    /// TGETS: A = B[strings[C]]
    TGetS = 55,
    /// TGETB: A = B[C] (unsigned 8-bit literal key)
    TGetB = 56,
    /// TSETV: B[C] = A
    TSetV = 57,
    /// TSETS: B[strings[C]] = A
    TSetS = 58,
    /// TSETB: B[C] = A (unsigned 8-bit literal key)
    TSetB = 59,
    /// TSETM: (A-1)[start], ... = A, ... (start index in numbers[D])
    TSetM = 60,
    /// CALLM: A, ..., A+B-2 = A(A+1, ..., A+C, ...)
    CallM = 61,
    /// CALL: A, ..., A+B-2 = A(A+1, ..., A+C-1)
    Call = 62,
    /// CALLMT: return A(A+1, ..., A+D, ...)
    CallMT = 63,
    /// CALLT: return A(A+1, ..., A+D-1)
    CallT = 64,
    /// ITERC: A, A+1, A+2 = A-3, A-2, A-1; A, ..., A+B-2 = A(A+1, A+2)
    IterC = 65,
    /// ITERN: specialized ITERC for `next`
    IterN = 66,
    /// VARG: A, ..., A+B-2 = ...
    VArg = 67,
    /// ISNEXT: verify `next` iteration and JMP D
    IsNext = 68,
    /// RETM: return A, ..., A+D-1, ...
    RetM = 69,
    /// RET: return A, ..., A+D-2
    Ret = 70,
    /// RET0: return
    Ret0 = 71,
    /// RET1: return A
    Ret1 = 72,
    /// FORI: numeric for loop init, skip to D when the loop is empty
    ForI = 73,
    /// JFORI: JIT-compiled FORI
    JForI = 74,
    /// FORL: numeric for loop step, JMP D while looping
    ForL = 75,
    /// IFORL: interpreter-forced FORL
    IForL = 76,
    /// JFORL: JIT-compiled FORL
    JForL = 77,
    /// ITERL: if A ~= nil then A-1 = A; JMP D
    IterL = 78,
    /// IITERL: interpreter-forced ITERL
    IIterL = 79,
    /// JITERL: JIT-compiled ITERL
    JIterL = 80,
    /// LOOP: loop hint for the JIT
    Loop = 81,
    /// ILOOP: interpreter-forced LOOP
    ILoop = 82,
    /// JLOOP: JIT-compiled LOOP
    JLoop = 83,
    /// JMP: jump to D
    Jmp = 84,
    /// FUNCF: fixed-argument Lua function header
    FuncF = 85,
    /// IFUNCF: interpreter-forced FUNCF
    IFuncF = 86,
    /// JFUNCF: JIT-compiled FUNCF
    JFuncF = 87,
    /// FUNCV: variadic Lua function header
    FuncV = 88,
    /// IFUNCV: interpreter-forced FUNCV
    IFuncV = 89,
    /// JFUNCV: JIT-compiled FUNCV
    JFuncV = 90,
    /// FUNCC: C function pseudo-header
    FuncC = 91,
    /// FUNCCW: wrapped C function pseudo-header
    FuncCW = 92,
}

impl OpCode {
    /// Try to convert a raw opcode byte to an OpCode.
    pub fn from_byte(byte: u8) -> Option<Self> {
        if byte <= 92 {
            // SAFETY: all values 0..=92 are valid OpCode discriminants
            Some(unsafe { std::mem::transmute::<u8, OpCode>(byte) })
        } else {
            None
        }
    }

    /// LuaJIT's mnemonic for this opcode (`ISLT`, `ADDVN`, ...).
    pub fn mnemonic(self) -> String {
        format!("{:?}", self).to_uppercase()
    }

    /// Operand kinds of the A, B and C/D fields.
    ///
    /// An opcode whose B kind is [`OperandKind::None`] uses the 16-bit D
    /// field, every other opcode uses the 8-bit C field.
    pub fn operand_kinds(self) -> (OperandKind, OperandKind, OperandKind) {
        use OperandKind::*;
        use OpCode::*;

        match self {
            IsLt | IsGe | IsLe | IsGt | IsEqV | IsNeV => (Var, None, Var),
            IsEqS | IsNeS => (Var, None, String),
            IsEqN | IsNeN => (Var, None, Number),
            IsEqP | IsNeP => (Var, None, Primitive),
            IsTC | IsFC => (Dst, None, Var),
            IsT | IsF => (None, None, Var),

            Mov | Not | Unm | Len => (Dst, None, Var),

            AddVN | SubVN | MulVN | DivVN | ModVN => (Dst, Var, Number),
            AddNV | SubNV | MulNV | DivNV | ModNV => (Dst, Var, Number),
            AddVV | SubVV | MulVV | DivVV | ModVV | Pow => (Dst, Var, Var),
            Cat => (Dst, RBase, RBase),

            KStr => (Dst, None, String),
            KCData => (Dst, None, Cdata),
            KShort => (Dst, None, SignedLiteral),
            KNum => (Dst, None, Number),
            KPri => (Dst, None, Primitive),
            KNil => (Base, None, Base),

            UGet => (Dst, None, Upvalue),
            USetV => (Upvalue, None, Var),
            USetS => (Upvalue, None, String),
            USetN => (Upvalue, None, Number),
            USetP => (Upvalue, None, Primitive),
            UClo => (RBase, None, Jump),
            FNew => (Dst, None, Function),

            TNew => (Dst, None, Literal),
            TDup => (Dst, None, Table),
            GGet => (Dst, None, String),
            GSet => (Var, None, String),
            TGetV => (Dst, Var, Var),
            TGetS => (Dst, Var, String),
            TGetB => (Dst, Var, Literal),
            TSetV => (Var, Var, Var),
            TSetS => (Var, Var, String),
            TSetB => (Var, Var, Literal),
            TSetM => (Base, None, Number),

            CallM | Call => (Base, Literal, Literal),
            CallMT | CallT => (Base, None, Literal),
            IterC | IterN => (Base, Literal, Literal),
            VArg => (Base, Literal, Literal),
            IsNext => (Base, None, Jump),

            RetM => (Base, None, Literal),
            Ret | Ret0 | Ret1 => (RBase, None, Literal),

            ForI | JForI | ForL | IForL | JForL => (Base, None, Jump),
            IterL | IIterL | JIterL => (Base, None, Jump),
            Loop | ILoop | JLoop => (RBase, None, Jump),
            Jmp => (RBase, None, Jump),

            FuncF | IFuncF | JFuncF | FuncV | IFuncV | JFuncV | FuncC | FuncCW => {
                (RBase, None, None)
            }
        }
    }

    /// Whether the instruction uses the 8-bit B and C fields.
    pub fn is_abc(self) -> bool {
        self.operand_kinds().1 != OperandKind::None
    }

    /// Comparison and truthiness tests, always paired with a following `Jmp`.
    pub fn is_test(self) -> bool {
        (self as u8) <= (OpCode::IsF as u8)
    }

    /// Arithmetic opcodes from `AddVN` to `Pow`.
    pub fn is_arithmetic(self) -> bool {
        (OpCode::AddVN as u8..=OpCode::Pow as u8).contains(&(self as u8))
    }

    /// Instructions that end a block by jumping somewhere other than the
    /// next instruction.
    pub fn is_jump(self) -> bool {
        matches!(
            self,
            OpCode::Jmp | OpCode::UClo | OpCode::IsNext | OpCode::ForI | OpCode::JForI
        )
    }

    /// Numeric loop entries (`FORI` family).
    pub fn is_numeric_loop_entry(self) -> bool {
        matches!(self, OpCode::ForI | OpCode::JForI)
    }

    /// Numeric loop latches (`FORL` family).
    pub fn is_numeric_loop_latch(self) -> bool {
        matches!(self, OpCode::ForL | OpCode::IForL | OpCode::JForL)
    }

    /// Iterator loop latches (`ITERL` family).
    pub fn is_iterator_loop_latch(self) -> bool {
        matches!(self, OpCode::IterL | OpCode::IIterL | OpCode::JIterL)
    }

    /// Iterator calls that precede an `ITERL`.
    pub fn is_iterator_call(self) -> bool {
        matches!(self, OpCode::IterC | OpCode::IterN)
    }

    /// Backward jumps at the bottom of a `for` loop.
    pub fn is_loop_latch(self) -> bool {
        self.is_numeric_loop_latch() || self.is_iterator_loop_latch()
    }
}

impl std::fmt::Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(&self.mnemonic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_byte_covers_instruction_set() {
        for byte in 0..=92u8 {
            let op = OpCode::from_byte(byte).unwrap();
            assert_eq!(op as u8, byte);
        }
        assert_eq!(OpCode::from_byte(93), None);
        assert_eq!(OpCode::from_byte(0xFF), None);
    }

    #[test]
    fn test_mnemonics_match_luajit_names() {
        assert_eq!(OpCode::IsLt.mnemonic(), "ISLT");
        assert_eq!(OpCode::AddVN.mnemonic(), "ADDVN");
        assert_eq!(OpCode::KCData.mnemonic(), "KCDATA");
        assert_eq!(OpCode::CallMT.mnemonic(), "CALLMT");
        assert_eq!(OpCode::FuncCW.mnemonic(), "FUNCCW");
    }

    #[test]
    fn test_instruction_formats() {
        assert!(OpCode::AddVV.is_abc());
        assert!(OpCode::Call.is_abc());
        assert!(OpCode::TGetS.is_abc());
        assert!(!OpCode::CallT.is_abc());
        assert!(!OpCode::IsLt.is_abc());
        assert!(!OpCode::Jmp.is_abc());
    }

    #[test]
    fn test_classification() {
        assert!(OpCode::IsF.is_test());
        assert!(!OpCode::Mov.is_test());
        assert!(OpCode::Pow.is_arithmetic());
        assert!(!OpCode::Cat.is_arithmetic());
        assert!(OpCode::JForL.is_loop_latch());
        assert!(OpCode::IIterL.is_loop_latch());
        assert!(!OpCode::Loop.is_loop_latch());
    }
}
