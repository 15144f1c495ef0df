use super::Endpoint;
use super::Range;
use super::Token;
use super::TokenMetadata;

#[test]
fn test_bootstrapping_nodes_stay_out_of_snapshot() {
    let metadata = TokenMetadata::new();
    metadata.update(Token(10), Endpoint::new("a", 7000), false);
    metadata.update(Token(20), Endpoint::new("b", 7000), true);

    let snapshot = metadata.snapshot();
    assert_eq!(snapshot.tokens(), vec![Token(10)]);
    assert_eq!(
        metadata.bootstrapping_endpoints(),
        vec![(Token(20), Endpoint::new("b", 7000))]
    );
}

#[test]
fn test_flipping_bootstrap_flag_moves_entry() {
    let metadata = TokenMetadata::new();
    metadata.update(Token(20), Endpoint::new("b", 7000), true);
    metadata.update(Token(20), Endpoint::new("b", 7000), false);

    assert_eq!(metadata.snapshot().tokens(), vec![Token(20)]);
    assert!(metadata.bootstrapping_endpoints().is_empty());
}

#[test]
fn test_snapshot_is_isolated_from_later_updates() {
    let metadata = TokenMetadata::new();
    metadata.update(Token(10), Endpoint::new("a", 7000), false);

    let snapshot = metadata.snapshot();
    metadata.update(Token(30), Endpoint::new("c", 7000), false);

    assert_eq!(snapshot.len(), 1);
    assert_eq!(metadata.snapshot().len(), 2);
}

#[test]
fn test_remove_clears_both_maps() {
    let metadata = TokenMetadata::new();
    metadata.update(Token(10), Endpoint::new("a", 7000), false);
    metadata.remove(&Token(10));
    assert!(metadata.snapshot().is_empty());
}

#[test]
fn test_primary_range_of_endpoint() {
    let metadata = TokenMetadata::new();
    metadata.update(Token(10), Endpoint::new("a", 7000), false);
    metadata.update(Token(20), Endpoint::new("b", 7000), false);
    metadata.update(Token(30), Endpoint::new("c", 7000), false);

    let snapshot = metadata.snapshot();
    assert_eq!(
        snapshot.primary_range(&Endpoint::new("a", 7000)),
        Some(Range::new(Token(30), Token(10)))
    );
    assert_eq!(snapshot.primary_range(&Endpoint::new("x", 7000)), None);
}

#[test]
fn test_successors_walk_clockwise_and_wrap() {
    let metadata = TokenMetadata::new();
    metadata.update(Token(10), Endpoint::new("a", 7000), false);
    metadata.update(Token(20), Endpoint::new("b", 7000), false);
    metadata.update(Token(30), Endpoint::new("c", 7000), false);

    let order: Vec<Token> = metadata
        .snapshot()
        .successors(&Token(20))
        .into_iter()
        .map(|(t, _)| t)
        .collect();
    assert_eq!(order, vec![Token(30), Token(10), Token(20)]);
}
