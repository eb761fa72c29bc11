//! Window operations executed by DataFusion from the rendered SQL.

mod common;

use common::{assert_close, int_batch, run_datafusion, session};
use tabula::prelude::*;

fn ns() -> Namespace {
    session(Engine::DataFusion).namespace()
}

fn ints(values: &[i64]) -> Vec<Option<i64>> {
    values.iter().copied().map(Some).collect()
}

fn floats(values: &[Option<f64>]) -> Vec<Option<f64>> {
    values.to_vec()
}

#[tokio::test]
async fn cum_sum_forward_and_reverse() {
    let ns = ns();
    let batch = int_batch(&[
        ("i", ints(&[0, 1, 2])),
        ("p", ints(&[1, 1, 2])),
        ("v", ints(&[10, 20, 5])),
    ]);
    let out = run_datafusion(
        batch,
        &[
            ns.col("v").cum_sum(false).over_columns(&["p"], &["i"]).alias("fwd"),
            ns.col("v").cum_sum(true).over_columns(&["p"], &["i"]).alias("rev"),
        ],
    )
    .await;
    assert_eq!(out["fwd"], [Some(10.0), Some(30.0), Some(5.0)]);
    assert_eq!(out["rev"], [Some(30.0), Some(20.0), Some(5.0)]);
}

#[tokio::test]
async fn cum_count_skips_nulls() {
    let ns = ns();
    let batch = int_batch(&[
        ("i", ints(&[0, 1, 2, 3])),
        ("v", vec![Some(1), None, Some(3), Some(4)]),
    ]);
    let out = run_datafusion(
        batch,
        &[ns.col("v").cum_count(false).over_columns(&[], &["i"])],
    )
    .await;
    assert_eq!(out["v"], [Some(1.0), Some(1.0), Some(2.0), Some(3.0)]);
}

#[tokio::test]
async fn rolling_mean_respects_min_samples() {
    let ns = ns();
    let batch = int_batch(&[("i", ints(&[0, 1, 2, 3])), ("v", ints(&[1, 2, 3, 4]))]);
    let out = run_datafusion(
        batch,
        &[ns.col("v").rolling_mean(3, Some(3), false).over_columns(&[], &["i"])],
    )
    .await;
    assert_close(&out["v"], &floats(&[None, None, Some(2.0), Some(3.0)]));
}

#[tokio::test]
async fn rolling_std_sample() {
    let ns = ns();
    let batch = int_batch(&[("i", ints(&[0, 1, 2])), ("v", ints(&[1, 3, 7]))]);
    let out = run_datafusion(
        batch,
        &[ns.col("v").rolling_std(2, Some(2), false, 1).over_columns(&[], &["i"])],
    )
    .await;
    let root2 = 2f64.sqrt();
    assert_close(&out["v"], &floats(&[None, Some(root2), Some(2.0 * root2)]));
}

#[tokio::test]
async fn rank_max_shares_the_highest_position() {
    let ns = ns();
    let batch = int_batch(&[("i", ints(&[0, 1, 2])), ("v", ints(&[10, 10, 20]))]);
    let out = run_datafusion(batch, &[ns.col("v").rank(RankMethod::Max, false)]).await;
    assert_eq!(out["v"], [Some(2.0), Some(2.0), Some(3.0)]);
}

#[tokio::test]
async fn rank_methods_with_ties_and_nulls() {
    let ns = ns();
    let batch = int_batch(&[
        ("i", ints(&[0, 1, 2, 3, 4, 5])),
        ("a", vec![Some(3), Some(6), Some(1), Some(1), None, Some(6)]),
    ]);
    let a = ns.col("a");
    let out = run_datafusion(
        batch,
        &[
            a.rank(RankMethod::Average, false).alias("average"),
            a.rank(RankMethod::Min, false).alias("min"),
            a.rank(RankMethod::Max, false).alias("max"),
            a.rank(RankMethod::Dense, false).alias("dense"),
            a.rank(RankMethod::Ordinal, false).over_columns(&[], &["i"]).alias("ordinal"),
        ],
    )
    .await;
    assert_close(
        &out["average"],
        &floats(&[Some(3.0), Some(4.5), Some(1.5), Some(1.5), None, Some(4.5)]),
    );
    assert_eq!(out["min"], [Some(3.0), Some(4.0), Some(1.0), Some(1.0), None, Some(4.0)]);
    assert_eq!(out["max"], [Some(3.0), Some(5.0), Some(2.0), Some(2.0), None, Some(5.0)]);
    assert_eq!(out["dense"], [Some(2.0), Some(3.0), Some(1.0), Some(1.0), None, Some(3.0)]);
    assert_eq!(out["ordinal"], [Some(3.0), Some(4.0), Some(1.0), Some(2.0), None, Some(5.0)]);
}

#[tokio::test]
async fn ordinal_rank_breaks_ties_with_order_keys() {
    let ns = ns();
    let batch = int_batch(&[
        ("i", ints(&[0, 1, 2, 3, 4, 5])),
        ("a", ints(&[1, 1, 2, 2, 3, 3])),
        ("b", vec![Some(3), None, Some(4), Some(3), Some(5), Some(6)]),
    ]);
    let out = run_datafusion(
        batch,
        &[ns.col("a").rank(RankMethod::Ordinal, false).over_columns(&[], &["b"])],
    )
    .await;
    assert_eq!(
        out["a"],
        [Some(2.0), Some(1.0), Some(4.0), Some(3.0), Some(5.0), Some(6.0)]
    );
}

#[tokio::test]
async fn descending_rank_within_partitions() {
    let ns = ns();
    let batch = int_batch(&[
        ("i", ints(&[0, 1, 2, 3])),
        ("g", ints(&[1, 1, 2, 2])),
        ("v", ints(&[5, 7, 1, 1])),
    ]);
    let out = run_datafusion(
        batch,
        &[ns.col("v").rank(RankMethod::Min, true).over_columns(&["g"], &[])],
    )
    .await;
    assert_eq!(out["v"], [Some(2.0), Some(1.0), Some(1.0), Some(1.0)]);
}

#[tokio::test]
async fn shift_and_diff() {
    let ns = ns();
    let batch = int_batch(&[("i", ints(&[0, 1, 2])), ("v", ints(&[1, 4, 9]))]);
    let v = ns.col("v");
    let out = run_datafusion(
        batch,
        &[
            v.shift(1).over_columns(&[], &["i"]).alias("lag"),
            v.shift(-1).over_columns(&[], &["i"]).alias("lead"),
            v.diff().over_columns(&[], &["i"]).alias("diff"),
        ],
    )
    .await;
    assert_eq!(out["lag"], [None, Some(1.0), Some(4.0)]);
    assert_eq!(out["lead"], [Some(4.0), Some(9.0), None]);
    assert_eq!(out["diff"], [None, Some(3.0), Some(5.0)]);
}

#[tokio::test]
async fn distinct_flags() {
    let ns = ns();
    let batch = int_batch(&[("i", ints(&[0, 1, 2])), ("v", ints(&[1, 1, 2]))]);
    let v = ns.col("v");
    let out = run_datafusion(
        batch,
        &[
            v.is_first_distinct().over_columns(&[], &["i"]).alias("first"),
            v.is_last_distinct().over_columns(&[], &["i"]).alias("last"),
            v.is_unique().alias("unique"),
        ],
    )
    .await;
    assert_eq!(out["first"], [Some(1.0), Some(0.0), Some(1.0)]);
    assert_eq!(out["last"], [Some(0.0), Some(1.0), Some(1.0)]);
    assert_eq!(out["unique"], [Some(0.0), Some(0.0), Some(1.0)]);
}

#[tokio::test]
async fn partition_sum_is_filled_with_zero() {
    let ns = ns();
    let batch = int_batch(&[
        ("i", ints(&[0, 1, 2])),
        ("p", ints(&[1, 1, 2])),
        ("v", vec![Some(1), Some(2), None]),
    ]);
    let out = run_datafusion(
        batch,
        &[
            ns.col("v").sum().over_columns(&["p"], &[]).alias("total"),
            ns.col("v").mean().over_columns(&["p"], &[]).alias("mean"),
        ],
    )
    .await;
    assert_eq!(out["total"], [Some(3.0), Some(3.0), Some(0.0)]);
    assert_close(&out["mean"], &floats(&[Some(1.5), Some(1.5), None]));
}

#[tokio::test]
async fn elementwise_ops_push_down_through_windows() {
    let ns = ns();
    let batch = int_batch(&[("i", ints(&[0, 1, 2])), ("v", ints(&[-1, -2, 4]))]);
    let out = run_datafusion(
        batch,
        &[(ns.col("v").cum_sum(false).abs() * 10).over_columns(&[], &["i"])],
    )
    .await;
    assert_eq!(out["v"], [Some(10.0), Some(30.0), Some(10.0)]);
}

#[tokio::test]
async fn horizontal_sum_treats_nulls_as_zero() {
    let ns = ns();
    let batch = int_batch(&[
        ("i", ints(&[0, 1])),
        ("a", vec![Some(1), None]),
        ("b", vec![Some(2), Some(5)]),
    ]);
    let out = run_datafusion(
        batch,
        &[
            ns.sum_horizontal(vec![ns.col("a"), ns.col("b")])
                .unwrap()
                .alias("sum"),
            ns.mean_horizontal(vec![ns.col("a"), ns.col("b")])
                .unwrap()
                .alias("mean"),
        ],
    )
    .await;
    assert_eq!(out["sum"], [Some(3.0), Some(5.0)]);
    assert_close(&out["mean"], &floats(&[Some(1.5), Some(5.0)]));
}

#[tokio::test]
async fn cumulative_ops_carry_running_value_over_nulls() {
    let ns = ns();
    let batch = int_batch(&[
        ("i", ints(&[0, 1, 2, 3, 4])),
        ("v", vec![None, Some(1), Some(2), None, Some(4)]),
    ]);
    let v = ns.col("v");
    let out = run_datafusion(
        batch,
        &[
            v.cum_sum(false).over_columns(&[], &["i"]).alias("sum"),
            v.cum_max(false).over_columns(&[], &["i"]).alias("max"),
            v.cum_min(true).over_columns(&[], &["i"]).alias("min_rev"),
        ],
    )
    .await;
    assert_eq!(out["sum"], [None, Some(1.0), Some(3.0), Some(3.0), Some(7.0)]);
    assert_eq!(out["max"], [None, Some(1.0), Some(2.0), Some(2.0), Some(4.0)]);
    assert_eq!(out["min_rev"], [Some(1.0), Some(1.0), Some(2.0), Some(4.0), Some(4.0)]);
}

#[tokio::test]
async fn n_unique_over_partition_counts_null_once() {
    let ns = ns();
    let batch = int_batch(&[
        ("i", ints(&[0, 1, 2, 3, 4])),
        ("g", ints(&[1, 1, 1, 2, 2])),
        ("v", vec![Some(1), Some(1), Some(2), None, Some(5)]),
    ]);
    let out = run_datafusion(batch, &[ns.col("v").n_unique().over_columns(&["g"], &[])]).await;
    assert_eq!(out["v"], [Some(2.0); 5]);
}

#[tokio::test]
async fn std_and_var_with_ddof_two_over_partition() {
    let ns = ns();
    let batch = int_batch(&[
        ("i", ints(&[0, 1, 2, 3, 4, 5])),
        ("g", ints(&[1, 1, 1, 2, 2, 2])),
        ("v", ints(&[1, 2, 3, 2, 4, 6])),
    ]);
    let v = ns.col("v");
    let out = run_datafusion(
        batch,
        &[
            v.std(2).over_columns(&["g"], &[]).alias("std"),
            v.var(2).over_columns(&["g"], &[]).alias("var"),
        ],
    )
    .await;
    let (a, b) = (2f64.sqrt(), 8f64.sqrt());
    assert_close(&out["std"], &floats(&[Some(a), Some(a), Some(a), Some(b), Some(b), Some(b)]));
    assert_close(
        &out["var"],
        &floats(&[Some(2.0), Some(2.0), Some(2.0), Some(8.0), Some(8.0), Some(8.0)]),
    );
}

#[tokio::test]
async fn centered_rolling_sum_with_even_window() {
    let ns = ns();
    let batch = int_batch(&[("i", ints(&[0, 1, 2, 3, 4, 5])), ("v", ints(&[1, 2, 4, 8, 16, 32]))]);
    let out = run_datafusion(
        batch,
        &[ns.col("v").rolling_sum(4, Some(1), true).over_columns(&[], &["i"])],
    )
    .await;
    assert_eq!(
        out["v"],
        [Some(3.0), Some(7.0), Some(15.0), Some(30.0), Some(60.0), Some(56.0)]
    );
}

#[tokio::test]
async fn rolling_var_population() {
    let ns = ns();
    let batch = int_batch(&[("i", ints(&[0, 1, 2, 3])), ("v", ints(&[1, 3, 5, 7]))]);
    let out = run_datafusion(
        batch,
        &[ns.col("v").rolling_var(3, Some(2), false, 0).over_columns(&[], &["i"])],
    )
    .await;
    assert_close(&out["v"], &floats(&[None, Some(1.0), Some(8.0 / 3.0), Some(8.0 / 3.0)]));
}
