use chordalysis::{Criterion, Explorer, Lattice, LatticeConfig, SearchConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::EnvFilter;

/// Samples a chain of binary variables where each one copies its predecessor with probability
/// `fidelity`.
fn sample_chain(rng: &mut StdRng, nb_variables: usize, fidelity: f64) -> Vec<Option<usize>> {
    let mut row = Vec::with_capacity(nb_variables);
    let mut value = usize::from(rng.gen_bool(0.5));
    for _ in 0..nb_variables {
        row.push(Some(value));
        if !rng.gen_bool(fidelity) {
            value = 1 - value;
        }
    }
    row
}

fn main() -> Result<(), chordalysis::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let mut args = std::env::args().skip(1);
    let nb_variables = args.next().and_then(|s| s.parse().ok()).unwrap_or(6);
    let nb_instances = args.next().and_then(|s| s.parse().ok()).unwrap_or(5000);

    let mut rng = StdRng::seed_from_u64(0x5eed);
    let rows: Vec<_> = (0..nb_instances)
        .map(|_| sample_chain(&mut rng, nb_variables, 0.85))
        .collect();
    let lattice = Lattice::from_instances(&vec![2; nb_variables], &LatticeConfig::default(), rows)?;

    for criterion in [
        Criterion::PValue,
        Criterion::Bic,
        Criterion::Kl,
        Criterion::Mml,
        Criterion::Qnml,
    ] {
        let config = SearchConfig {
            criterion,
            max_clique_size: Some(4),
            // Sampled data hardly ever shows an entropy gain of exactly zero.
            max_steps: if criterion == Criterion::Kl {
                Some(nb_variables.saturating_sub(1))
            } else {
                None
            },
            ..SearchConfig::default()
        };
        let mut explorer = Explorer::new(&lattice, &config)?;
        let termination = explorer.explore()?;

        print!("{:?} ({:?}):", criterion, termination);
        for action in explorer.operations() {
            print!(" {}", action.edge);
        }
        println!();
        if let Some(evaluation) = explorer.evaluate() {
            println!(
                "  entropy {:.4}, {} parameters, BIC {:.1}",
                evaluation.entropy,
                evaluation.degrees_of_freedom,
                evaluation.bayesian_information_criterion()
            );
        }
    }
    Ok(())
}
