/// An entry in the error code registry.
pub struct ErrorEntry {
    pub code: &'static str,
    pub short: &'static str,  // one-line summary, shown by `explain --list`
    pub long: &'static str,   // full explanation for `explain CODE`
}

/// All stable error codes.
pub static REGISTRY: &[ErrorEntry] = &[
    // ── Lexer ────────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "SSM-L001",
        short: "unexpected character",
        long: r#"## SSM-L001: unexpected character

The listing contains a character that does not start any token.
Tokens are `fn`, identifiers, numbers, double-quoted strings and
newlines; comments start with `--`.

**Example:**

    fn main
      pi @

Strings must be closed on the line they open on.
"#,
    },
    // ── Parser ───────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "SSM-P001",
        short: "expected an instruction",
        long: r#"## SSM-P001: expected an instruction

Every non-blank line is either a `fn NAME` header or an instruction
starting with a mnemonic. This line starts with something else.

**Example:**

    fn main
      42
"#,
    },
    ErrorEntry {
        code: "SSM-P002",
        short: "missing function name",
        long: r#"## SSM-P002: missing function name

`fn` must be followed by the name the function is registered under.

**Example that triggers this:**

    fn 3

**Fix:**

    fn main
"#,
    },
    ErrorEntry {
        code: "SSM-P003",
        short: "unknown instruction",
        long: r#"## SSM-P003: unknown instruction

The mnemonic is not one of: pi sl ll sg lg puts copy exit ret add sub
mul div jump jeq jneq jlt jgt call label.
"#,
    },
    ErrorEntry {
        code: "SSM-P004",
        short: "missing operand",
        long: r#"## SSM-P004: missing operand

`pi`, `sl`, `ll`, `sg`, `lg`, `call`, `label` and every jump take exactly
one operand.

**Example that triggers this:**

    pi

**Fix:**

    pi 10
"#,
    },
    ErrorEntry {
        code: "SSM-P005",
        short: "unexpected operand",
        long: r#"## SSM-P005: unexpected operand

`puts`, `copy`, `exit`, `ret`, `add`, `sub`, `mul` and `div` take no
operand. Push values with `pi` first.

**Example that triggers this:**

    puts 3

**Fix:**

    pi 3
    puts
"#,
    },
    ErrorEntry {
        code: "SSM-P006",
        short: "trailing tokens",
        long: r#"## SSM-P006: trailing tokens

An instruction or header is followed by more tokens on the same line.
One instruction per line, at most one operand.
"#,
    },
    ErrorEntry {
        code: "SSM-P007",
        short: "instruction outside of a function",
        long: r#"## SSM-P007: instruction outside of a function

Instructions belong to the function opened by the nearest `fn` header
above them. This one comes before any header.
"#,
    },
    ErrorEntry {
        code: "SSM-P008",
        short: "duplicate function",
        long: r#"## SSM-P008: duplicate function

Two `fn` headers in one listing use the same name. Function names are
unique per VM.
"#,
    },
    // ── Assembler ────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "SSM-A001",
        short: "duplicate label",
        long: r#"## SSM-A001: duplicate label

A label name was declared twice in one function, so jumps to it are
ambiguous. Labels are local to their function; the same name may be
reused in another one.
"#,
    },
    ErrorEntry {
        code: "SSM-A002",
        short: "label without a name",
        long: r#"## SSM-A002: label without a name

A `label` instruction must carry a string naming it. A number or a
missing operand is rejected.
"#,
    },
    ErrorEntry {
        code: "SSM-A003",
        short: "jump without a target",
        long: r#"## SSM-A003: jump without a target

A jump instruction has no operand. Give it a label name or a relative
offset.
"#,
    },
    ErrorEntry {
        code: "SSM-A004",
        short: "jump targets a function reference",
        long: r#"## SSM-A004: jump targets a function reference

Jump operands must be label names or numeric offsets.
"#,
    },
    // ── Linker ───────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "SSM-K001",
        short: "call to undefined function",
        long: r#"## SSM-K001: call to undefined function

A `call` names a function that is not registered. Linking resolves
every call at once, so nothing is patched when one of them fails.

**Example that triggers this:**

    fn main
      call missing
"#,
    },
    ErrorEntry {
        code: "SSM-K002",
        short: "call without a usable target",
        long: r#"## SSM-K002: call without a usable target

A `call` has no operand, or its operand is a function reference
rather than a name or index.
"#,
    },
    // ── Registry ─────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "SSM-R001",
        short: "function already registered",
        long: r#"## SSM-R001: function already registered

A function was added under a name that is already in use. The
earlier registration is kept.
"#,
    },
    ErrorEntry {
        code: "SSM-R002",
        short: "entry function not found",
        long: r#"## SSM-R002: entry function not found

`run` was asked to start at a function that is not registered. The
CLI starts at `main` unless `--entry` says otherwise.
"#,
    },
    ErrorEntry {
        code: "SSM-R003",
        short: "call stack not empty",
        long: r#"## SSM-R003: call stack not empty

`run` was called while frames from an earlier, faulted run are still
on the call stack. Reset the VM first.
"#,
    },
    // ── Execution faults ─────────────────────────────────────────────────────
    ErrorEntry {
        code: "SSM-E001",
        short: "operand type mismatch",
        long: r#"## SSM-E001: operand type mismatch

A binary instruction popped operands of two different types. There
are no implicit conversions.

**Example that triggers this:**

    pi 1
    pi "a"
    add
"#,
    },
    ErrorEntry {
        code: "SSM-E002",
        short: "unsupported operand type",
        long: r#"## SSM-E002: unsupported operand type

Both operands have the same type but the instruction is not defined
for it: `sub`, `mul` and `div` on strings, or any arithmetic or
comparison on function references.
"#,
    },
    ErrorEntry {
        code: "SSM-E003",
        short: "missing immediate",
        long: r#"## SSM-E003: missing immediate

An instruction that needs an immediate was executed without one.
"#,
    },
    ErrorEntry {
        code: "SSM-E004",
        short: "expected a whole number",
        long: r#"## SSM-E004: expected a whole number

Slot indices, jump offsets and call targets must be whole numbers that fit a
signed 64-bit integer.
"#,
    },
    ErrorEntry {
        code: "SSM-E005",
        short: "slot out of range",
        long: r#"## SSM-E005: slot out of range

Each frame has 256 local slots and the VM has 256 global slots,
numbered from 0.
"#,
    },
    ErrorEntry {
        code: "SSM-E006",
        short: "unresolved target",
        long: r#"## SSM-E006: unresolved target

A jump or call still carries a name at execution time. For jumps this
means no label of that name exists in the function.
"#,
    },
    ErrorEntry {
        code: "SSM-E007",
        short: "invalid call target",
        long: r#"## SSM-E007: invalid call target

A numeric `call` operand does not index a registered function.
"#,
    },
    ErrorEntry {
        code: "SSM-E008",
        short: "operand stack underflow",
        long: r#"## SSM-E008: operand stack underflow

An instruction needed more values than the operand stack holds.

**Example that triggers this:**

    fn main
      puts
"#,
    },
    ErrorEntry {
        code: "SSM-E009",
        short: "operand stack overflow",
        long: r#"## SSM-E009: operand stack overflow

The operand stack reached its configured limit.
"#,
    },
    ErrorEntry {
        code: "SSM-E010",
        short: "call depth exceeded",
        long: r#"## SSM-E010: call depth exceeded

Too many nested calls, usually recursion without a base case. The
limit is set with `--max-call-depth`.
"#,
    },
    ErrorEntry {
        code: "SSM-E011",
        short: "jump out of range",
        long: r#"## SSM-E011: jump out of range

A jump offset lands before the first instruction of the function, or so far
past it that the target cannot be represented.
"#,
    },
    ErrorEntry {
        code: "SSM-E012",
        short: "ran off the end of a function",
        long: r#"## SSM-E012: ran off the end of a function

Execution reached the end of a function without `ret` or `exit`, or a
jump landed past its last instruction.
"#,
    },
    // ── Internal ─────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "SSM-I001",
        short: "internal VM error",
        long: r#"## SSM-I001: internal VM error

The interpreter found its own state inconsistent, for example a label
that survived assembly. The VM refuses further work afterwards.

If you see this, please file a bug report.
"#,
    },
    ErrorEntry {
        code: "SSM-I002",
        short: "VM poisoned",
        long: r#"## SSM-I002: VM poisoned

An earlier internal error left this VM unusable. Create a new one.
"#,
    },
];

/// Look up an error entry by code (e.g. `"SSM-E001"`).
pub fn lookup(code: &str) -> Option<&'static ErrorEntry> {
    REGISTRY.iter().find(|e| e.code.eq_ignore_ascii_case(code))
}
