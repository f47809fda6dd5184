use py_kitaev::{DisorderParameter, KitaevHamiltonianBlock, KitaevResult};

fn main() -> KitaevResult<()> {
    let n = 8;
    let disorder = DisorderParameter::new(n, 1.0, Some(1));

    for q in 0..n + 1 {
        let mut block = KitaevHamiltonianBlock::new(n, q, &disorder)?;
        block.diagonalize(false)?;
        print!("Q={}\tdim={}\t", q, block.dim());
        print_spectrum(block.eigenvalues()?.iter().map(|e| e.re));
    }
    Ok(())
}

fn print_spectrum<It: IntoIterator<Item = f64>>(evs: It) {
    let mut evs = evs.into_iter().collect::<Vec<_>>();
    evs.sort_by(|a, b| a.total_cmp(b));
    evs.iter().for_each(|e| print!("{:.3}\t", e));
    println!()
}
