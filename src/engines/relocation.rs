//! Jump relocation.
//!
//! Jumps are tracked in lines (instruction indices) rather than byte offsets,
//! because lines are the unit of mutation. The jump map is computed once
//! with a full scan and then kept correct incrementally on every insertion.

use crate::error::{CodevolveError, Result};
use crate::isa::Instruction;
use serde::{Deserialize, Serialize};

/// One relative jump in a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JumpMetadata {
    pub source: usize,
    pub destination: usize,
    pub displacement: i32,
}

impl JumpMetadata {
    pub fn is_forward(&self) -> bool {
        self.displacement >= 0
    }
}

/// Scan every instruction and resolve the destination line of each jump
pub fn compute_initial_jump_map(instructions: &[Instruction]) -> Result<Vec<JumpMetadata>> {
    let mut jumps = Vec::new();

    for (line, instruction) in instructions.iter().enumerate() {
        if let Some(displacement) = instruction.displacement() {
            let destination = resolve_destination(instructions, line, displacement)?;
            log::trace!("jump {} -> {} ({:+})", line, destination, displacement);
            jumps.push(JumpMetadata {
                source: line,
                destination,
                displacement,
            });
        }
    }

    Ok(jumps)
}

/// Walk from `source` summing instruction lengths until the displacement is covered.
///
/// An exact match lands on the line after the last one summed; an overshoot
/// lands one line before the line that crossed the displacement.
pub fn resolve_destination(
    instructions: &[Instruction],
    source: usize,
    displacement: i32,
) -> Result<usize> {
    let target = displacement.unsigned_abs() as u64;
    let mut line = source as isize;
    let mut sum: u64 = 0;

    let destination = loop {
        if sum > target {
            break line - 1;
        }
        if sum == target {
            break line + 1;
        }

        if displacement >= 0 {
            line += 1;
            let instruction = instructions
                .get(line as usize)
                .ok_or(CodevolveError::JumpOutOfRange { line: source })?;
            sum += instruction.len() as u64;
        } else {
            let instruction = usize::try_from(line)
                .ok()
                .and_then(|l| instructions.get(l))
                .ok_or(CodevolveError::JumpOutOfRange { line: source })?;
            sum += instruction.len() as u64;
            line -= 1;
        }
    };

    // one past the last line is a valid landing spot (falls off the end)
    usize::try_from(destination)
        .ok()
        .filter(|&d| d <= instructions.len())
        .ok_or(CodevolveError::JumpOutOfRange { line: source })
}

/// Update every jump for an instruction of `inserted_len` bytes about to be
/// placed at `insert_line`. Must run before the insertion itself.
pub fn remap_on_insert(
    insert_line: usize,
    inserted_len: usize,
    instructions: &mut [Instruction],
    jumps: &mut [JumpMetadata],
) -> Result<()> {
    let delta = inserted_len as i64;

    for jump in jumps.iter_mut() {
        if jump.is_forward() {
            if jump.source < insert_line && insert_line <= jump.destination {
                let displacement = jump.displacement as i64 + delta;
                rewrite(instructions, jump, displacement)?;
                jump.destination += 1;
            } else if insert_line <= jump.source {
                jump.source += 1;
                jump.destination += 1;
            }
        } else if jump.destination < insert_line && insert_line <= jump.source {
            let displacement = jump.displacement as i64 - delta;
            rewrite(instructions, jump, displacement)?;
            jump.source += 1;
        } else if insert_line <= jump.destination {
            jump.source += 1;
            jump.destination += 1;
        }
    }

    Ok(())
}

fn rewrite(instructions: &mut [Instruction], jump: &mut JumpMetadata, displacement: i64) -> Result<()> {
    let displacement = i32::try_from(displacement)
        .map_err(|_| CodevolveError::DisplacementOverflow { line: jump.source })?;

    let instruction = instructions
        .get_mut(jump.source)
        .ok_or(CodevolveError::JumpOutOfRange { line: jump.source })?;
    if !instruction.set_displacement(displacement) {
        return Err(CodevolveError::JumpOutOfRange { line: jump.source });
    }

    log::trace!(
        "jump at line {} displacement {:+} -> {:+}",
        jump.source,
        jump.displacement,
        displacement
    );
    jump.displacement = displacement;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::{decode_stream, InstructionTable};

    // 2^n mod p: rdi = b, rsi = n, rdx = p
    const MODEXP: [u8; 42] = [
        0x55, // 0 push rbp
        0x48, 0x89, 0xE5, // 1 mov rbp, rsp
        0x48, 0x89, 0xD1, // 2 mov rcx, rdx
        0x66, 0xB8, 0x01, 0x00, // 3 mov ax, 1
        0x4D, 0x31, 0xC0, // 4 xor r8, r8
        0x49, 0x39, 0xF0, // 5 cmp r8, rsi
        0x0F, 0x83, 0x11, 0x00, 0x00, 0x00, // 6 jae +0x11
        0x48, 0xF7, 0xE7, // 7 mul rdi
        0x48, 0xF7, 0xF1, // 8 div rcx
        0x48, 0x89, 0xD0, // 9 mov rax, rdx
        0x49, 0xFF, 0xC0, // 10 inc r8
        0xE9, 0xE6, 0xFF, 0xFF, 0xFF, // 11 jmp -0x1A
        0x5D, // 12 pop rbp
        0xC3, // 13 ret
    ];

    fn modexp() -> Vec<Instruction> {
        decode_stream(&MODEXP, &InstructionTable::new()).unwrap()
    }

    fn nop3(table: &InstructionTable) -> Instruction {
        // inc rbx
        Instruction::new(vec![0x48, 0xFF, 0xC3], table).unwrap()
    }

    #[test]
    fn test_initial_jump_map() {
        let jumps = compute_initial_jump_map(&modexp()).unwrap();
        assert_eq!(
            jumps,
            vec![
                JumpMetadata { source: 6, destination: 12, displacement: 0x11 },
                JumpMetadata { source: 11, destination: 5, displacement: -0x1A },
            ]
        );
    }

    #[test]
    fn test_zero_displacement_lands_on_next_line() {
        let table = InstructionTable::new();
        let code = [0xE9, 0, 0, 0, 0, 0xC3];
        let instructions = decode_stream(&code, &table).unwrap();
        assert_eq!(resolve_destination(&instructions, 0, 0).unwrap(), 1);
    }

    #[test]
    fn test_overshoot_lands_before_crossing_line() {
        let table = InstructionTable::new();
        // jmp +2 into the middle of a 3-byte instruction at line 1
        let code = [0xE9, 2, 0, 0, 0, 0x48, 0xFF, 0xC3, 0xC3];
        let instructions = decode_stream(&code, &table).unwrap();
        assert_eq!(resolve_destination(&instructions, 0, 2).unwrap(), 0);
    }

    #[test]
    fn test_jump_out_of_range() {
        let table = InstructionTable::new();
        let code = [0xE9, 0x40, 0, 0, 0, 0xC3];
        let instructions = decode_stream(&code, &table).unwrap();
        assert!(matches!(
            compute_initial_jump_map(&instructions),
            Err(CodevolveError::JumpOutOfRange { line: 0 })
        ));

        let code = [0xC3, 0xE9, 0xF0, 0xFF, 0xFF, 0xFF];
        let instructions = decode_stream(&code, &table).unwrap();
        assert!(matches!(
            compute_initial_jump_map(&instructions),
            Err(CodevolveError::JumpOutOfRange { line: 1 })
        ));
    }

    #[test]
    fn test_forward_jump_insert_inside_span() {
        let table = InstructionTable::new();
        let mut instructions = modexp();
        let mut jumps = compute_initial_jump_map(&instructions).unwrap();

        remap_on_insert(8, 3, &mut instructions, &mut jumps).unwrap();

        assert_eq!(jumps[0], JumpMetadata { source: 6, destination: 13, displacement: 0x14 });
        assert_eq!(instructions[6].bytes(), &[0x0F, 0x83, 0x14, 0x00, 0x00, 0x00]);

        instructions.insert(8, nop3(&table));
        assert_eq!(compute_initial_jump_map(&instructions).unwrap(), jumps);
    }

    #[test]
    fn test_insert_before_both_jumps_shifts_lines() {
        let mut instructions = modexp();
        let mut jumps = compute_initial_jump_map(&instructions).unwrap();
        let before = instructions.clone();

        remap_on_insert(2, 3, &mut instructions, &mut jumps).unwrap();

        assert_eq!(jumps[0], JumpMetadata { source: 7, destination: 13, displacement: 0x11 });
        assert_eq!(jumps[1], JumpMetadata { source: 12, destination: 6, displacement: -0x1A });
        assert_eq!(instructions, before);
    }

    #[test]
    fn test_backward_jump_rewrites_its_own_field() {
        let table = InstructionTable::new();
        let mut instructions = modexp();
        let mut jumps = compute_initial_jump_map(&instructions).unwrap();

        // inside the loop body; both jumps' spans cover line 10
        remap_on_insert(10, 7, &mut instructions, &mut jumps).unwrap();

        assert_eq!(jumps[1], JumpMetadata { source: 12, destination: 5, displacement: -0x21 });
        // the 5-byte jmp keeps its opcode and takes the new rel32 in its last four bytes
        assert_eq!(instructions[11].bytes(), &[0xE9, 0xDF, 0xFF, 0xFF, 0xFF]);
        // the 6-byte jae is rewritten independently
        assert_eq!(instructions[6].bytes(), &[0x0F, 0x83, 0x18, 0x00, 0x00, 0x00]);

        let gene = Instruction::new(vec![0x49, 0x81, 0xC1, 1, 2, 3, 4], &table).unwrap();
        instructions.insert(10, gene);
        assert_eq!(compute_initial_jump_map(&instructions).unwrap(), jumps);
    }

    #[test]
    fn test_insert_after_both_ends_is_ignored() {
        let mut instructions = modexp();
        let mut jumps = compute_initial_jump_map(&instructions).unwrap();
        let expected = jumps.clone();

        remap_on_insert(13, 3, &mut instructions, &mut jumps).unwrap();
        assert_eq!(jumps, expected);
    }

    #[test]
    fn test_displacement_overflow() {
        let table = InstructionTable::new();
        let mut instructions = vec![
            Instruction::new(vec![0xE9, 0xFF, 0xFF, 0xFF, 0x7F], &table).unwrap(),
            nop3(&table),
        ];
        let mut jumps = vec![JumpMetadata {
            source: 0,
            destination: 2,
            displacement: i32::MAX,
        }];

        let err = remap_on_insert(1, 3, &mut instructions, &mut jumps).unwrap_err();
        assert!(matches!(err, CodevolveError::DisplacementOverflow { line: 0 }));
    }
}
