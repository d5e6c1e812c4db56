use std::cmp::Ordering;

/// Largest-remainder (Hamilton) apportionment of `total_seats` across
/// regions by population.
///
/// Exact quotas are computed over the full seat count, floors assigned,
/// and leftover seats go to the largest fractional remainders (ties to the
/// larger population, then to the region name ascending). Whenever the
/// seat count allows it, every region ends up with at least one seat, the
/// guarantee funded by the largest allocations. Fewer seats than regions
/// degenerates to one seat for each of the first `total_seats` regions.
pub fn hamilton_apportion(regions: &[(String, u64)], total_seats: u32) -> Vec<u32> {
    let n = regions.len();
    if n == 0 || total_seats == 0 {
        return vec![0; n];
    }
    if (total_seats as usize) < n {
        return (0..n)
            .map(|i| u32::from(i < total_seats as usize))
            .collect();
    }

    let total_pop: u64 = regions.iter().map(|r| r.1).sum();
    let mut alloc = vec![0u32; n];
    if total_pop == 0 {
        // no population data: round-robin
        for s in 0..total_seats {
            alloc[s as usize % n] += 1;
        }
        return alloc;
    }

    let mut assigned = 0u32;
    let mut remainders: Vec<(usize, f64)> = Vec::with_capacity(n);
    for (i, (_, pop)) in regions.iter().enumerate() {
        let exact = *pop as f64 * total_seats as f64 / total_pop as f64;
        let floor = exact.floor() as u32;
        alloc[i] = floor;
        assigned += floor;
        remainders.push((i, exact - floor as f64));
    }

    remainders.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| regions[b.0].1.cmp(&regions[a.0].1))
            .then_with(|| regions[a.0].0.cmp(&regions[b.0].0))
    });
    let mut leftover = total_seats.saturating_sub(assigned);
    let mut k = 0usize;
    while leftover > 0 {
        alloc[remainders[k % n].0] += 1;
        leftover -= 1;
        k += 1;
    }

    // Seat floor of one per region, funded by the largest allocations.
    loop {
        let zero = match alloc.iter().position(|&a| a == 0) {
            Some(i) => i,
            None => break,
        };
        let mut donor = 0usize;
        for i in 1..n {
            if alloc[i] > alloc[donor] {
                donor = i;
            }
        }
        if alloc[donor] <= 1 {
            break;
        }
        alloc[donor] -= 1;
        alloc[zero] += 1;
    }
    alloc
}

/// Highest-averages (D'Hondt) allocation of `seats` across party vote
/// counts: each seat goes to the party maximizing `votes/(seats_won+1)`,
/// recomputed after every award. Quotient ties go to the party with fewer
/// seats won, then more raw votes, then the lower index.
pub fn dhondt_allocate(votes: &[u64], seats: u32) -> Vec<u32> {
    let n = votes.len();
    let mut alloc = vec![0u32; n];
    if n == 0 {
        return alloc;
    }
    for _ in 0..seats {
        let mut best = 0usize;
        for i in 1..n {
            let q = votes[i] as f64 / (alloc[i] as f64 + 1.0);
            let bq = votes[best] as f64 / (alloc[best] as f64 + 1.0);
            let better = q > bq
                || (q == bq
                    && (alloc[i] < alloc[best]
                        || (alloc[i] == alloc[best] && votes[i] > votes[best])));
            if better {
                best = i;
            }
        }
        alloc[best] += 1;
    }
    alloc
}
