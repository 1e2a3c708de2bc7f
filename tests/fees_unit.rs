use podm::fees::compute_split;

#[test]
fn split_concrete_example() {
    assert_eq!(compute_split(1000, 12.5), (125, 875));
}

#[test]
fn fee_rounds_half_up() {
    // 10 * 5% = 0.5 -> fee 1, payout absorbs the remainder
    assert_eq!(compute_split(10, 5.0), (1, 9));
    // 333 * 10% = 33.3 -> fee 33
    assert_eq!(compute_split(333, 10.0), (33, 300));
}

#[test]
fn split_always_sums_to_gross() {
    let rates = [0.0, 1.5, 10.0, 12.5, 33.3, 50.0, 99.9, 100.0];
    for gross in (0..=10_000).step_by(37) {
        for &rate in &rates {
            let (fee, payout) = compute_split(gross, rate);
            assert_eq!(fee + payout, gross, "gross={gross} rate={rate}");
            assert!(fee >= 0, "gross={gross} rate={rate}");
            assert!(payout >= 0, "gross={gross} rate={rate}");
        }
    }
}

#[test]
fn boundary_rates() {
    assert_eq!(compute_split(500, 0.0), (0, 500));
    assert_eq!(compute_split(500, 100.0), (500, 0));
    assert_eq!(compute_split(0, 12.5), (0, 0));
}
