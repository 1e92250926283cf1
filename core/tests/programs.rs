use chip8_core::{Chip8, Chip8Builder, Instruction, Step, PROGRAM_START};
use proptest::prelude::*;

fn chip(rom: &[u8]) -> Chip8 {
    Chip8Builder::new()
        .with_rom(rom.to_vec())
        .with_rng_seed(7)
        .build()
        .unwrap()
}

/// ROM image with `code` at `addr` (absolute) and zeros before it.
fn place(rom: &mut Vec<u8>, addr: u16, code: &[u8]) {
    let offset = (addr - PROGRAM_START) as usize;
    if rom.len() < offset + code.len() {
        rom.resize(offset + code.len(), 0);
    }
    rom[offset..offset + code.len()].copy_from_slice(code);
}

#[test]
fn counting_loop_runs_without_growing_the_stack() {
    // V0 = 5; V0 += 3; jump 0x200
    let mut chip = chip(&[0x60, 0x05, 0x70, 0x03, 0x12, 0x00]);

    chip.step();
    assert_eq!(chip.machine().register(0), 5);

    chip.step();
    assert_eq!(chip.machine().register(0), 8);

    chip.step();
    assert_eq!(chip.machine().pc(), 0x200);

    for _ in 0..300 {
        chip.step();
    }
    assert_eq!(chip.machine().pc(), 0x200);
    assert_eq!(chip.machine().sp(), 0);
    assert_eq!(chip.fault_count(), 0);
}

#[test]
fn split_fetch_and_execute_match_step() {
    let mut chip = chip(&[0x60, 0x05, 0x70, 0x03]);

    chip.fetch();
    assert_eq!(chip.machine().opcode(), 0x6005);
    assert_eq!(chip.execute(), Step::Executed(Instruction::LoadImm { x: 0, nn: 5 }));

    chip.fetch();
    chip.execute();
    assert_eq!(chip.machine().register(0), 8);
    assert_eq!(chip.machine().pc(), 0x204);
}

#[test]
fn call_and_return_resume_after_the_call() {
    let mut rom = Vec::new();
    // 0x200: CALL 0x300; 0x202: LD V1, 1
    place(&mut rom, 0x200, &[0x23, 0x00, 0x61, 0x01]);
    // 0x300: LD V2, 2; RET
    place(&mut rom, 0x300, &[0x62, 0x02, 0x00, 0xEE]);
    let mut chip = chip(&rom);

    chip.step();
    assert_eq!(chip.machine().pc(), 0x300);
    assert_eq!(chip.machine().stack(), &[0x200]);

    chip.step();
    chip.step();
    assert_eq!(chip.machine().pc(), 0x202);
    assert_eq!(chip.machine().sp(), 0);

    chip.step();
    assert_eq!(chip.machine().register(1), 1);
    assert_eq!(chip.machine().register(2), 2);
}

#[test]
fn delay_timer_floors_at_zero() {
    let mut chip = chip(&[]);
    chip.machine_mut().set_delay_timer(2);

    for _ in 0..3 {
        chip.tick_timers();
    }
    assert_eq!(chip.machine().delay_timer(), 0);

    chip.tick_timers();
    assert_eq!(chip.machine().delay_timer(), 0);
}

#[test]
fn busy_wait_on_delay_timer() {
    // 0x200: LD V0, 3; LD DT, V0
    // 0x204: LD V1, DT; SE V1, 0; JP 0x204
    // 0x20A: LD V2, 0xAA
    let rom = [
        0x60, 0x03, 0xF0, 0x15, 0xF1, 0x07, 0x31, 0x00, 0x12, 0x04, 0x62, 0xAA,
    ];
    let mut chip = chip(&rom);

    for _ in 0..20 {
        chip.step();
        if chip.machine().pc() == 0x204 {
            chip.tick_timers();
        }
    }

    assert_eq!(chip.machine().register(2), 0xAA);
    assert_eq!(chip.machine().delay_timer(), 0);
}

#[test]
fn renderer_consumes_draw_pending() {
    // LD F, V0; DRW V0, V0, 5
    let mut chip = chip(&[0xF0, 0x29, 0xD0, 0x05, 0x12, 0x04]);
    assert!(chip.machine_mut().framebuffer_mut().take_draw_pending());

    chip.step();
    assert!(!chip.machine().framebuffer().is_draw_pending());

    chip.step();
    assert!(chip.machine_mut().framebuffer_mut().take_draw_pending());

    chip.step();
    assert!(!chip.machine().framebuffer().is_draw_pending());
}

#[test]
fn unknown_opcodes_do_not_stall() {
    let mut chip = chip(&[0xFF, 0xFF, 0x00, 0x00, 0x61, 0x01]);

    assert!(matches!(chip.step(), Step::Fault(_)));
    assert!(matches!(chip.step(), Step::Fault(_)));
    chip.step();

    assert_eq!(chip.fault_count(), 2);
    assert_eq!(chip.machine().register(1), 1);
}

#[test]
fn wait_key_resumes_on_press() {
    // LD V4, K; JP 0x202
    let mut chip = chip(&[0xF4, 0x0A, 0x12, 0x02]);

    for _ in 0..10 {
        assert_eq!(chip.step(), Step::WaitingForKey);
    }

    chip.machine_mut().set_key(0xE, true);
    chip.step();

    assert_eq!(chip.machine().register(4), 0xE);
    assert_eq!(chip.machine().pc(), 0x202);
}

proptest! {
    #[test]
    fn load_immediate_sets_register(x in 0u8..16, nn in any::<u8>()) {
        let mut chip = chip(&[0x60 | x, nn]);

        chip.step();

        prop_assert_eq!(chip.machine().register(x as usize), nn);
        prop_assert_eq!(chip.machine().pc(), 0x202);
    }

    #[test]
    fn add_registers_sets_carry(x in 0u8..15, y in 0u8..15, vx in any::<u8>(), vy in any::<u8>()) {
        prop_assume!(x != y);
        let mut chip = chip(&[0x80 | x, (y << 4) | 0x4]);
        chip.machine_mut().set_register(x as usize, vx);
        chip.machine_mut().set_register(y as usize, vy);

        chip.step();

        let sum = vx as u16 + vy as u16;
        prop_assert_eq!(chip.machine().register(x as usize), (sum % 256) as u8);
        prop_assert_eq!(chip.machine().register(0xF), (sum > 255) as u8);
    }

    #[test]
    fn drawing_twice_restores_the_screen(vx in any::<u8>(), vy in any::<u8>(), n in 1u8..16, glyph in 0u8..16) {
        // LD F, V2; DRW V0, V1, n; DRW V0, V1, n
        let mut chip = chip(&[0xF2, 0x29, 0xD0, 0x10 | n, 0xD0, 0x10 | n]);
        chip.machine_mut().set_register(0, vx);
        chip.machine_mut().set_register(1, vy);
        chip.machine_mut().set_register(2, glyph);
        let before = chip.machine().framebuffer().cells().to_vec();

        chip.step();
        chip.step();
        let lit = chip.machine().framebuffer().cells().iter().any(|&c| c != 0);
        chip.step();

        prop_assert_eq!(chip.machine().framebuffer().cells(), &before[..]);
        prop_assert_eq!(chip.machine().register(0xF), lit as u8);
    }

    #[test]
    fn bcd_digits(v in any::<u8>()) {
        let mut chip = chip(&[0xF0, 0x33]);
        chip.machine_mut().set_register(0, v);
        chip.machine_mut().set_index(0x400);

        chip.step();

        let mem = &chip.machine().memory()[0x400..0x403];
        prop_assert_eq!(mem, &[v / 100, (v / 10) % 10, v % 10][..]);
    }

    #[test]
    fn store_then_load_registers(x in 0u8..16, values in prop::array::uniform16(any::<u8>()), index in 0x300u16..0xF00) {
        // LD [I], VX; LD VX, [I] with the registers cleared in between
        let mut chip = chip(&[0xF0 | x, 0x55, 0xF0 | x, 0x65]);
        for (r, &v) in values.iter().enumerate() {
            chip.machine_mut().set_register(r, v);
        }
        chip.machine_mut().set_index(index);

        chip.step();
        for r in 0..=x as usize {
            chip.machine_mut().set_register(r, 0);
        }
        chip.step();

        prop_assert_eq!(&chip.machine().registers()[..=x as usize], &values[..=x as usize]);
        prop_assert_eq!(chip.machine().index(), index);
    }
}
