use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use pursuit_bot::{SearchKind, Searcher, better_evaluation};
use pursuit_core::game::{CollisionRule, GridState};
use pursuit_core::model::Layout;
use std::sync::Arc;

const MAZE: &str = "\
%%%%%%%%%%%
%P   .   .%
% %% %%% %%
%.  G   . %
%%% % %%% %
%.   G    %
%%%%%%%%%%%
";

fn bench_search_decision(c: &mut Criterion) {
    let mut group = c.benchmark_group("search_decision");
    let layout = match Layout::parse(MAZE) {
        Ok(layout) => Arc::new(layout),
        Err(err) => panic!("bench layout is invalid: {err}"),
    };

    for kind in [SearchKind::Minimax, SearchKind::AlphaBeta, SearchKind::Expectimax] {
        for depth in [1u32, 2] {
            group.bench_function(format!("{}_depth{}", kind.as_str(), depth), |b| {
                b.iter_batched(
                    || GridState::new(layout.clone(), CollisionRule::Deadly),
                    |state| {
                        let searcher = Searcher::new(kind, depth).ok();
                        searcher.map(|searcher| searcher.search(&state, better_evaluation::<GridState>))
                    },
                    BatchSize::SmallInput,
                )
            });
        }
    }

    group.bench_function("reflex", |b| {
        b.iter_batched(
            || GridState::new(layout.clone(), CollisionRule::Deadly),
            |state| {
                let searcher = Searcher::new(SearchKind::Reflex, 1).ok();
                searcher.map(|searcher| searcher.search(&state, better_evaluation::<GridState>))
            },
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

criterion_group!(benches, bench_search_decision);
criterion_main!(benches);
