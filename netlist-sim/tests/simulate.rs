//! End-to-end simulation tests over built and scheduled programs.

use netlist_ir::{Program, ProgramBuilder, RegId, RegisterFlags, Word};
use netlist_sim::{DependencyGraph, ImageError, MemoryImage, Simulator};
use rstest::rstest;

const IN: RegisterFlags = RegisterFlags::INPUT;
const OUT: RegisterFlags = RegisterFlags::OUTPUT;

fn scheduled(builder: ProgramBuilder) -> Program {
    let mut program = builder.build().expect("program must build");
    DependencyGraph::build(&program)
        .schedule(&mut program)
        .expect("program must schedule");
    program
}

#[test]
fn load_copies_its_input() {
    let mut builder = ProgramBuilder::new();
    let a = builder.add_register(8, Some("a"), IN);
    let b = builder.add_register(8, Some("b"), OUT);
    builder.add_load(b, a);
    let program = scheduled(builder);

    let mut sim = Simulator::new(&program).unwrap();
    sim.set_register(a, 0b1001_1101);
    sim.cycle();
    assert_eq!(sim.get_register(b), 0b1001_1101);
}

#[test]
fn const_is_masked_to_the_output_width() {
    let mut builder = ProgramBuilder::new();
    let b = builder.add_register(4, Some("b"), OUT);
    builder.add_const(b, 0b1011_0010);
    let program = scheduled(builder);

    let mut sim = Simulator::new(&program).unwrap();
    sim.cycle();
    assert_eq!(sim.get_register(b), 0b0010);
}

#[test]
fn not_stays_inside_the_bus() {
    let mut builder = ProgramBuilder::new();
    let a = builder.add_register(8, Some("a"), IN);
    let b = builder.add_register(8, Some("b"), OUT);
    builder.add_not(b, a);
    let program = scheduled(builder);

    let mut sim = Simulator::new(&program).unwrap();
    sim.set_register(a, 0b1001_1101);
    sim.cycle();
    assert_eq!(sim.get_register(b), 0b0110_0010);
}

type BinaryAdd = fn(&mut ProgramBuilder, RegId, RegId, RegId);

#[rstest]
#[case::and(ProgramBuilder::add_and as BinaryAdd, 0b0000_1101)]
#[case::nand(ProgramBuilder::add_nand as BinaryAdd, 0b1111_0010)]
#[case::or(ProgramBuilder::add_or as BinaryAdd, 0b1111_1101)]
#[case::nor(ProgramBuilder::add_nor as BinaryAdd, 0b0000_0010)]
#[case::xor(ProgramBuilder::add_xor as BinaryAdd, 0b1111_0000)]
#[case::xnor(ProgramBuilder::add_xnor as BinaryAdd, 0b0000_1111)]
fn binary_ops_match_their_truth_tables(#[case] add: BinaryAdd, #[case] expected: Word) {
    let mut builder = ProgramBuilder::new();
    let a = builder.add_register(8, Some("a"), IN);
    let b = builder.add_register(8, Some("b"), IN);
    let c = builder.add_register(8, Some("c"), OUT);
    add(&mut builder, c, a, b);
    let program = scheduled(builder);

    let mut sim = Simulator::new(&program).unwrap();
    sim.set_register(a, 0b1001_1101);
    sim.set_register(b, 0b0110_1101);
    sim.cycle();
    assert_eq!(sim.get_register(c), expected);
}

#[test]
fn and_gate_end_to_end() {
    let mut builder = ProgramBuilder::new();
    let a = builder.add_register(1, Some("a"), IN);
    let b = builder.add_register(1, Some("b"), IN);
    let c = builder.add_register(1, Some("c"), OUT);
    builder.add_and(c, a, b);
    let program = scheduled(builder);

    let mut sim = Simulator::new(&program).unwrap();
    sim.set_register(a, 1);
    sim.set_register(b, 0);
    sim.cycle();
    assert_eq!(sim.get_register(c), 0);

    sim.set_register(a, 1);
    sim.set_register(b, 1);
    sim.cycle();
    assert_eq!(sim.get_register(c), 1);
}

#[test]
fn mux_selects_the_second_operand_when_set() {
    let mut builder = ProgramBuilder::new();
    let a = builder.add_register(8, Some("a"), IN);
    let b = builder.add_register(8, Some("b"), IN);
    let s = builder.add_register(1, Some("s"), IN);
    let d = builder.add_register(8, Some("d"), OUT);
    builder.add_mux(d, s, a, b);
    let program = scheduled(builder);

    let mut sim = Simulator::new(&program).unwrap();
    sim.set_register(a, 0b1001_1101);
    sim.set_register(b, 0b0110_1101);

    sim.set_register(s, 1);
    sim.cycle();
    assert_eq!(sim.get_register(d), 0b0110_1101);

    sim.set_register(s, 0);
    sim.cycle();
    assert_eq!(sim.get_register(d), 0b1001_1101);
}

#[test]
fn reg_reads_the_previous_cycle() {
    // c = REG a; b = NOT c
    let mut builder = ProgramBuilder::new();
    let a = builder.add_register(1, Some("a"), IN);
    let b = builder.add_register(1, Some("b"), OUT);
    let c = builder.add_register(1, Some("c"), RegisterFlags::empty());
    builder.add_reg(c, a);
    builder.add_not(b, c);
    let program = scheduled(builder);

    let mut sim = Simulator::new(&program).unwrap();
    sim.set_register(a, 1);
    sim.cycle();
    // prev[a] was 0, so c = 0 and b = 1.
    assert_eq!(sim.get_register(b), 1);
    sim.cycle();
    assert_eq!(sim.get_register(b), 0);
}

#[test]
fn reg_self_feedback_toggles() {
    // x = REG y; y = NOT x: a one-bit counter.
    let mut builder = ProgramBuilder::new();
    let x = builder.add_register(1, Some("x"), RegisterFlags::empty());
    let y = builder.add_register(1, Some("y"), OUT);
    builder.add_reg(x, y);
    builder.add_not(y, x);
    let program = scheduled(builder);

    let mut sim = Simulator::new(&program).unwrap();
    let mut seen = Vec::new();
    for _ in 0..4 {
        sim.cycle();
        seen.push(sim.get_register(y));
    }
    assert_eq!(seen, vec![1, 0, 1, 0]);
}

#[test]
fn concat_puts_the_left_operand_in_the_high_bits() {
    let mut builder = ProgramBuilder::new();
    let a = builder.add_register(4, Some("a"), IN);
    let b = builder.add_register(3, Some("b"), IN);
    let c1 = builder.add_register(7, Some("c1"), OUT);
    let c2 = builder.add_register(7, Some("c2"), OUT);
    builder.add_concat(c1, a, b);
    builder.add_concat(c2, b, a);
    let program = scheduled(builder);

    let mut sim = Simulator::new(&program).unwrap();
    sim.set_register(a, 0b1001);
    sim.set_register(b, 0b010);
    sim.cycle();
    assert_eq!(sim.get_register(c1), 0b1001_010);
    assert_eq!(sim.get_register(c2), 0b010_1001);
}

#[rstest]
#[case(0, 1)]
#[case(1, 0)]
#[case(2, 1)]
#[case(7, 1)]
fn select_counts_from_the_lsb(#[case] bit: u32, #[case] expected: Word) {
    let mut builder = ProgramBuilder::new();
    let a = builder.add_register(8, Some("a"), IN);
    let o = builder.add_register(1, Some("o"), OUT);
    builder.add_select(o, bit, a);
    let program = scheduled(builder);

    let mut sim = Simulator::new(&program).unwrap();
    sim.set_register(a, 0b1001_1101);
    sim.cycle();
    assert_eq!(sim.get_register(o), expected);
}

#[test]
fn slice_extracts_an_inclusive_lsb_first_range() {
    let mut builder = ProgramBuilder::new();
    let a = builder.add_register(8, Some("a"), IN);
    let low = builder.add_register(4, Some("low"), OUT);
    let all = builder.add_register(8, Some("all"), OUT);
    let one = builder.add_register(1, Some("one"), OUT);
    let high = builder.add_register(4, Some("high"), OUT);
    builder.add_slice(low, 0, 3, a);
    builder.add_slice(all, 0, 7, a);
    builder.add_slice(one, 2, 2, a);
    builder.add_slice(high, 4, 7, a);
    let program = scheduled(builder);

    let mut sim = Simulator::new(&program).unwrap();
    sim.set_register(a, 0b1001_1101);
    sim.cycle();
    assert_eq!(sim.get_register(low), 0b1101);
    assert_eq!(sim.get_register(all), 0b1001_1101);
    assert_eq!(sim.get_register(one), 1);
    assert_eq!(sim.get_register(high), 0b1001);
}

#[test]
fn rom_reads_its_image() {
    let mut builder = ProgramBuilder::new();
    let addr = builder.add_register(2, Some("addr"), IN);
    let o = builder.add_register(4, Some("o"), OUT);
    builder.add_rom(o, 2, 4, addr);
    let program = scheduled(builder);

    let mut images = MemoryImage::new();
    images.insert_words("o", vec![0b0001, 0b0010, 0b0100, 0b1000]);
    let mut sim = Simulator::with_images(&program, &images).unwrap();

    for (addr_value, expected) in [(0, 0b0001), (3, 0b1000), (1, 0b0010)] {
        sim.set_register(addr, addr_value);
        sim.cycle();
        assert_eq!(sim.get_register(o), expected);
    }
}

#[test]
fn rom_without_an_image_is_fatal() {
    let mut builder = ProgramBuilder::new();
    let addr = builder.add_register(2, Some("addr"), IN);
    let o = builder.add_register(4, Some("o"), OUT);
    builder.add_rom(o, 2, 4, addr);
    let program = scheduled(builder);

    assert_eq!(
        Simulator::new(&program).unwrap_err(),
        ImageError::MissingRomImage { name: "o".into() }
    );
}

fn ram_program() -> (Program, [RegId; 5]) {
    let mut builder = ProgramBuilder::new();
    let ra = builder.add_register(2, Some("ra"), IN);
    let we = builder.add_register(1, Some("we"), IN);
    let wa = builder.add_register(2, Some("wa"), IN);
    let wd = builder.add_register(4, Some("wd"), IN);
    let o = builder.add_register(4, Some("o"), OUT);
    builder.add_ram(o, 2, 4, ra, we, wa, wd);
    (scheduled(builder), [ra, we, wa, wd, o])
}

#[test]
fn ram_reads_see_the_old_value_until_the_next_cycle() {
    let (program, [ra, we, wa, wd, o]) = ram_program();
    let mut sim = Simulator::new(&program).unwrap();

    // Write 0b1010 to cell 1 while reading cell 1: the read still sees 0.
    sim.set_register(ra, 1);
    sim.set_register(we, 1);
    sim.set_register(wa, 1);
    sim.set_register(wd, 0b1010);
    sim.cycle();
    assert_eq!(sim.get_register(o), 0);

    // The write committed at end of cycle.
    sim.set_register(we, 0);
    sim.cycle();
    assert_eq!(sim.get_register(o), 0b1010);
}

#[test]
fn ram_write_needs_its_enable_bit() {
    let (program, [ra, we, wa, wd, o]) = ram_program();
    let mut sim = Simulator::new(&program).unwrap();

    sim.set_register(ra, 2);
    sim.set_register(we, 0);
    sim.set_register(wa, 2);
    sim.set_register(wd, 0b1111);
    sim.cycle();
    sim.cycle();
    assert_eq!(sim.get_register(o), 0);
}

#[test]
fn ram_accepts_a_preloaded_image() {
    let (program, [ra, _, _, _, o]) = ram_program();
    let mut images = MemoryImage::new();
    images.insert_words("o", vec![7, 6, 5, 4]);
    let mut sim = Simulator::with_images(&program, &images).unwrap();

    sim.set_register(ra, 3);
    sim.cycle();
    assert_eq!(sim.get_register(o), 4);
}

#[rstest]
#[case::wrong_length(vec![1, 2, 3], ImageError::WrongLength { name: "o".into(), expected: 4, found: 3 })]
#[case::word_too_wide(vec![1, 2, 3, 0b10000], ImageError::WordTooWide { name: "o".into(), index: 3, value: 0b10000, width: 4 })]
fn bad_images_are_rejected(#[case] words: Vec<Word>, #[case] expected: ImageError) {
    let (program, _) = ram_program();
    let mut images = MemoryImage::new();
    images.insert_words("o", words);
    assert_eq!(Simulator::with_images(&program, &images).unwrap_err(), expected);
}

#[test]
fn images_must_name_a_block() {
    let (program, _) = ram_program();
    let mut images = MemoryImage::new();
    images.insert_words("nope", vec![0; 4]);
    assert_eq!(
        Simulator::with_images(&program, &images).unwrap_err(),
        ImageError::UnknownBlock { name: "nope".into() }
    );
}

#[test]
fn simulate_runs_cycles_back_to_back() {
    // A one-bit toggle, the smallest closed-loop program.
    let mut builder = ProgramBuilder::new();
    let count = builder.add_register(1, Some("count"), OUT);
    let next = builder.add_register(1, Some("next"), RegisterFlags::empty());
    builder.add_reg(count, next);
    builder.add_not(next, count);
    let program = scheduled(builder);

    let mut sim = Simulator::new(&program).unwrap();
    sim.simulate(4);
    // next toggles each cycle starting from NOT 0 = 1; count lags by one.
    assert_eq!(sim.get_register(count), 1);
    sim.simulate(1);
    assert_eq!(sim.get_register(count), 0);
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    /// A program exercising every combinational opcode at mixed widths.
    fn mixed_program() -> (Program, [RegId; 2]) {
        let mut builder = ProgramBuilder::new();
        let a = builder.add_register(8, Some("a"), IN);
        let b = builder.add_register(8, Some("b"), IN);
        let n = builder.add_register(8, Some("n"), OUT);
        let x = builder.add_register(8, Some("x"), OUT);
        let m = builder.add_register(8, Some("m"), OUT);
        let s = builder.add_register(1, Some("s"), RegisterFlags::empty());
        let sl = builder.add_register(5, Some("sl"), OUT);
        let cc = builder.add_register(16, Some("cc"), OUT);
        let d = builder.add_register(8, Some("d"), OUT);
        builder.add_nand(n, a, b);
        builder.add_xnor(x, a, b);
        builder.add_select(s, 7, a);
        builder.add_mux(m, s, a, b);
        builder.add_slice(sl, 2, 6, n);
        builder.add_concat(cc, n, x);
        builder.add_reg(d, m);
        (scheduled(builder), [a, b])
    }

    proptest! {
        /// After any cycle, every register value fits its declared width.
        #[test]
        fn width_containment(va: u64, vb: u64, cycles in 1usize..4) {
            let (program, [a, b]) = mixed_program();
            let mut sim = Simulator::new(&program).unwrap();
            sim.set_register(a, va);
            sim.set_register(b, vb);
            for _ in 0..cycles {
                sim.cycle();
            }
            for index in 0..program.registers().len() {
                let reg = RegId::from_index(index);
                let width = program.width(reg);
                prop_assert!(u128::from(sim.get_register(reg)) < (1u128 << width));
            }
        }
    }
}
