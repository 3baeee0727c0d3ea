use bindmerge::{
    Bindings, MergeFlags, MergePath, QueryContext, RID_NULL, Settings, TRUNCATION_WARNING, merge,
};

fn rows(b: &Bindings, names: &[&str]) -> Vec<Vec<u64>> {
    let mut out: Vec<Vec<u64>> = (0..b.len())
        .map(|r| names.iter().map(|n| b.value(n, r).0).collect())
        .collect();
    out.sort();
    out
}

fn accumulated() -> Bindings {
    let mut to = Bindings::new();
    to.add_vector("x", &[1, 2]).unwrap();
    to.add_vector("y", &[10, 20]).unwrap();
    to
}

#[test]
fn inner_join_keeps_matching_rows_only() {
    let mut ctx = QueryContext::new();
    let mut to = accumulated();
    let mut from = to.copy_and_clear();
    from.add_vector("x", &[1, 3]).unwrap();
    from.add_vector("z", &[100, 300]).unwrap();
    let summary = merge(&mut ctx, 1, &mut from, &mut to, &[], MergeFlags::NONE).unwrap();
    assert_eq!(summary.path, MergePath::Join);
    assert_eq!(summary.key, vec!["x".to_string()]);
    assert_eq!(summary.rows, 1);
    assert!(!summary.truncated);
    assert_eq!(rows(&to, &["x", "y", "z"]), vec![vec![1, 10, 100]]);
    assert!(ctx.warnings().is_empty());
}

#[test]
fn optional_join_pads_unmatched_rows() {
    let mut ctx = QueryContext::new();
    let mut to = accumulated();
    let mut from = to.copy_and_clear();
    from.add_vector("x", &[1]).unwrap();
    from.add_vector("z", &[100]).unwrap();
    merge(&mut ctx, 1, &mut from, &mut to, &[], MergeFlags::OPTIONAL).unwrap();
    assert_eq!(
        rows(&to, &["x", "y", "z"]),
        vec![vec![1, 10, 100], vec![2, 20, RID_NULL]]
    );
}

#[test]
fn equal_values_from_different_union_arms_stay_apart() {
    let mut ctx = QueryContext::new();
    ctx.set_union_group(1, 1).unwrap();
    ctx.set_union_group(2, 1).unwrap();
    let mut to = Bindings::new();
    to.add_tagged("x", 5, 1, true).unwrap();
    let mut from = to.copy_and_clear();
    from.add_tagged("x", 5, 2, true).unwrap();
    merge(&mut ctx, 2, &mut from, &mut to, &[], MergeFlags::UNION).unwrap();
    assert_eq!(to.len(), 2);
    let x = to.column("x").unwrap();
    assert_eq!(x.vals(), &[5, 5]);
    assert_eq!(x.ubs(), &[1, 2]);
}

#[test]
fn soft_limit_truncates_with_one_warning() {
    let mut ctx = QueryContext::restricted(100);
    let mut to = Bindings::new();
    to.add_vector("x", &[1; 10]).unwrap();
    to.add_vector("y", &(0..10).collect::<Vec<u64>>()).unwrap();
    let mut from = to.copy_and_clear();
    from.add_vector("x", &[1; 50]).unwrap();
    from.add_vector("z", &(0..50).collect::<Vec<u64>>()).unwrap();
    let summary = merge(&mut ctx, 1, &mut from, &mut to, &[], MergeFlags::NONE).unwrap();
    assert!(summary.truncated);
    assert_eq!(to.len(), 100);
    assert_eq!(ctx.warnings(), &[TRUNCATION_WARNING.to_string()]);
}

#[test]
fn unrestricted_context_ignores_soft_limit() {
    let settings = Settings {
        soft_limit: 5,
        ..Settings::default()
    };
    let mut ctx = QueryContext::from_settings(&settings);
    let mut to = Bindings::new();
    to.add_vector("x", &[1; 10]).unwrap();
    let mut from = to.copy_and_clear();
    from.add_vector("x", &[1; 3]).unwrap();
    from.add_vector("z", &[7, 8, 9]).unwrap();
    merge(&mut ctx, 1, &mut from, &mut to, &[], MergeFlags::NONE).unwrap();
    assert_eq!(to.len(), 30);
    assert!(ctx.warnings().is_empty());
}

#[test]
fn first_binding_inside_a_union_is_appended() {
    let mut ctx = QueryContext::new();
    ctx.set_union_group(1, 1).unwrap();
    ctx.set_union_group(2, 1).unwrap();
    let mut to = Bindings::new();
    to.add_vector("x", &[1, 2]).unwrap();
    let mut from = to.copy_and_clear();
    from.add_vector("x", &[3]).unwrap();
    from.set_used("x");
    from.note_bound_in_block("x", 2, 1);
    let summary = merge(&mut ctx, 2, &mut from, &mut to, &[], MergeFlags::UNION).unwrap();
    assert_eq!(summary.path, MergePath::Append);
    assert!(summary.key.is_empty());
    assert_eq!(to.values("x").unwrap().1, &[1, 2, 3]);
    assert_eq!(to.column("x").unwrap().bound_in_block(2), 1);
}

#[test]
fn append_pads_columns_bound_on_one_side() {
    let mut ctx = QueryContext::new();
    ctx.set_union_group(1, 1).unwrap();
    let mut to = Bindings::new();
    to.add_vector("x", &[1]).unwrap();
    to.add_vector("y", &[10]).unwrap();
    let mut from = to.copy_and_clear();
    from.add_vector("x", &[2]).unwrap();
    from.add_vector("z", &[30]).unwrap();
    from.set_used("x");
    from.note_bound_in_block("x", 1, 1);
    merge(&mut ctx, 1, &mut from, &mut to, &[], MergeFlags::UNION).unwrap();
    assert_eq!(to.values("x").unwrap().1, &[1, 2]);
    assert_eq!(to.values("y").unwrap().1, &[10, RID_NULL]);
    assert_eq!(to.values("z").unwrap().1, &[RID_NULL, 30]);
}

#[test]
fn empty_from_leaves_to_alone() {
    let mut ctx = QueryContext::new();
    let mut to = accumulated();
    let mut from = to.copy_and_clear();
    let summary = merge(&mut ctx, 1, &mut from, &mut to, &[], MergeFlags::NONE).unwrap();
    assert_eq!(summary.path, MergePath::Append);
    assert_eq!(rows(&to, &["x", "y"]), vec![vec![1, 10], vec![2, 20]]);
}

#[test]
fn no_shared_variables_gives_cross_product() {
    let mut ctx = QueryContext::new();
    let mut to = Bindings::new();
    to.add_vector("x", &[1, 2]).unwrap();
    let mut from = to.copy_and_clear();
    from.add_vector("y", &[7, 8, 9]).unwrap();
    merge(&mut ctx, 1, &mut from, &mut to, &[], MergeFlags::NONE).unwrap();
    assert_eq!(
        rows(&to, &["x", "y"]),
        vec![
            vec![1, 7],
            vec![1, 8],
            vec![1, 9],
            vec![2, 7],
            vec![2, 8],
            vec![2, 9],
        ]
    );
}

#[test]
fn duplicate_keys_multiply() {
    let mut ctx = QueryContext::new();
    let mut to = Bindings::new();
    to.add_vector("x", &[1, 1, 2]).unwrap();
    to.add_vector("y", &[10, 11, 20]).unwrap();
    let mut from = to.copy_and_clear();
    from.add_vector("x", &[1, 1]).unwrap();
    from.add_vector("z", &[100, 101]).unwrap();
    merge(&mut ctx, 1, &mut from, &mut to, &[], MergeFlags::NONE).unwrap();
    assert_eq!(
        rows(&to, &["x", "y", "z"]),
        vec![
            vec![1, 10, 100],
            vec![1, 10, 101],
            vec![1, 11, 100],
            vec![1, 11, 101],
        ]
    );
}

#[test]
fn null_in_the_key_matches_anything() {
    let mut ctx = QueryContext::new();
    let mut to = Bindings::new();
    to.add_vector("x", &[1, RID_NULL]).unwrap();
    to.add_vector("y", &[10, 20]).unwrap();
    let mut from = to.copy_and_clear();
    from.add_vector("x", &[2]).unwrap();
    from.add_vector("z", &[5]).unwrap();
    merge(&mut ctx, 1, &mut from, &mut to, &[], MergeFlags::NONE).unwrap();
    assert_eq!(rows(&to, &["x", "y", "z"]), vec![vec![2, 20, 5]]);
}

#[test]
fn new_variables_are_declared_and_projected_on_request() {
    let mut ctx = QueryContext::new();
    let mut to = accumulated();
    let mut from = to.copy_and_clear();
    from.add_vector("x", &[2]).unwrap();
    from.add("w", 4, false).unwrap();
    from.column_mut("w").unwrap().set_appears(Some(1));
    merge(&mut ctx, 1, &mut from, &mut to, &["w", "nobody"], MergeFlags::NONE).unwrap();
    let w = to.column("w").unwrap();
    assert!(w.projected());
    assert!(w.need_val());
    assert_eq!(w.appears(), Some(1));
    assert!(to.column("nobody").is_none());
    assert_eq!(rows(&to, &["x", "y", "w"]), vec![vec![2, 20, 4]]);
}

#[test]
fn declaring_past_the_variable_limit_fails() {
    let mut ctx = QueryContext::new();
    let mut to = Bindings::with_capacity(2);
    to.add_vector("x", &[1]).unwrap();
    to.add_vector("y", &[2]).unwrap();
    let mut from = Bindings::new();
    from.add_vector("z", &[3]).unwrap();
    assert!(merge(&mut ctx, 1, &mut from, &mut to, &[], MergeFlags::NONE).is_err());
}

fn keyed(name: &str, keys: &[u64], other: &str) -> Bindings {
    let mut b = Bindings::new();
    b.add_vector(name, keys).unwrap();
    b.add_vector(other, &keys.iter().map(|k| k * 10).collect::<Vec<u64>>())
        .unwrap();
    b
}

#[test]
fn rows_cut_before_the_scan_are_reported() {
    let mut ctx = QueryContext::restricted(2);
    let mut to = keyed("x", &[1, 2, 3], "y");
    let mut from = to.copy_and_clear();
    from.add_vector("x", &[1, 2, 3]).unwrap();
    from.add_vector("z", &[100, 200, 300]).unwrap();
    let summary = merge(&mut ctx, 1, &mut from, &mut to, &[], MergeFlags::NONE).unwrap();
    assert_eq!(to.len(), 2);
    assert!(summary.truncated, "third row was dropped by the soft limit");
    assert_eq!(ctx.warnings().len(), 1);
}

#[test]
fn optional_rows_cut_before_the_scan_are_reported() {
    let mut ctx = QueryContext::restricted(5);
    let mut to = keyed("x", &[1, 2, 3], "y");
    let mut from = to.copy_and_clear();
    from.add_vector("x", &(1..=10).collect::<Vec<u64>>()).unwrap();
    let summary = merge(&mut ctx, 1, &mut from, &mut to, &[], MergeFlags::OPTIONAL).unwrap();
    assert_eq!(to.len(), 5);
    assert!(summary.truncated);
    assert_eq!(ctx.warnings(), &[TRUNCATION_WARNING.to_string()]);
}

#[test]
fn limit_equal_to_the_result_size_is_not_a_truncation() {
    let mut ctx = QueryContext::restricted(3);
    let mut to = keyed("x", &[1, 2, 3], "y");
    let mut from = to.copy_and_clear();
    from.add_vector("x", &[1, 2, 3]).unwrap();
    from.add_vector("z", &[100, 200, 300]).unwrap();
    let summary = merge(&mut ctx, 1, &mut from, &mut to, &[], MergeFlags::NONE).unwrap();
    assert!(!summary.truncated);
    assert!(ctx.warnings().is_empty());
    assert_eq!(
        rows(&to, &["x", "y", "z"]),
        vec![vec![1, 10, 100], vec![2, 20, 200], vec![3, 30, 300]]
    );
}

#[test]
fn optional_merge_at_the_limit_still_fills_matches_in_place() {
    let mut ctx = QueryContext::restricted(2);
    let mut to = keyed("x", &[1, 2], "y");
    let mut from = to.copy_and_clear();
    from.add_vector("x", &[1, 2]).unwrap();
    from.add_vector("z", &[100, 200]).unwrap();
    let summary = merge(&mut ctx, 1, &mut from, &mut to, &[], MergeFlags::OPTIONAL).unwrap();
    assert!(!summary.truncated, "overwrites produce no new rows");
    assert_eq!(rows(&to, &["x", "y", "z"]), vec![vec![1, 10, 100], vec![2, 20, 200]]);
}

#[test]
fn optional_appends_stop_at_the_limit() {
    let mut ctx = QueryContext::restricted(3);
    let mut to = keyed("x", &[1, 2], "y");
    let mut from = to.copy_and_clear();
    from.add_vector("x", &[5, 6, 7]).unwrap();
    let summary = merge(&mut ctx, 1, &mut from, &mut to, &[], MergeFlags::OPTIONAL).unwrap();
    // both unmatched to rows are kept, so only one from row fits
    assert_eq!(to.len(), 3);
    assert!(summary.truncated);
    assert_eq!(ctx.warnings().len(), 1);
    assert_eq!(
        rows(&to, &["x", "y"]),
        vec![vec![1, 10], vec![2, 20], vec![5, RID_NULL]]
    );
}

#[test]
fn union_conflicts_count_retained_rows_against_the_limit() {
    let mut ctx = QueryContext::restricted(3);
    ctx.set_union_group(1, 1).unwrap();
    ctx.set_union_group(2, 1).unwrap();
    let mut to = Bindings::new();
    to.add_tagged("x", 5, 1, true).unwrap();
    to.add_tagged("x", 6, 1, true).unwrap();
    let mut from = to.copy_and_clear();
    from.add_tagged("x", 5, 2, true).unwrap();
    from.add_tagged("x", 6, 2, true).unwrap();
    let summary = merge(&mut ctx, 2, &mut from, &mut to, &[], MergeFlags::UNION).unwrap();
    assert!(summary.truncated);
    assert_eq!(to.len(), 3);
    let x = to.column("x").unwrap();
    assert_eq!(x.vals(), &[5, 6, 5]);
    assert_eq!(x.ubs(), &[1, 1, 2]);
    assert_eq!(ctx.warnings().len(), 1);
}
