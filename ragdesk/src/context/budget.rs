//! Character budget allocation across evidence sections

use serde::Serialize;
use std::collections::BTreeMap;

use crate::retrieval::EvidenceCategory;

/// Share of the budget reserved per section when several compete
pub const DEFAULT_FLOOR_FRACTION: f64 = 0.1;

/// Size and weight of one non-empty section, as seen by the allocator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionDemand {
    pub category: EvidenceCategory,
    pub char_count: usize,
    pub priority: u32,
}

/// Allocation computed for one request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContextBudget {
    pub total_chars: usize,
    pub allocations: BTreeMap<EvidenceCategory, usize>,
    pub minimum_floor: BTreeMap<EvidenceCategory, usize>,
}

impl ContextBudget {
    pub fn allocation(&self, category: EvidenceCategory) -> usize {
        self.allocations.get(&category).copied().unwrap_or(0)
    }

    pub fn allocated(&self) -> usize {
        self.allocations.values().sum()
    }
}

/// Split `total_chars` between `sections`.
///
/// A single section gets the whole budget. Otherwise each section is
/// guaranteed `floor_fraction` of the budget and the rest is shared in
/// proportion to `char_count * priority`. Sections below their minimum are
/// then topped up, first from unallocated chars and, when all minimums fit
/// in the budget, from sections holding more than their own minimum.
///
/// Invariant: the sum of allocations never exceeds `total_chars`.
pub fn allocate(
    total_chars: usize,
    sections: &[SectionDemand],
    minimum_floor: &BTreeMap<EvidenceCategory, usize>,
    floor_fraction: f64,
) -> ContextBudget {
    let mut budget = ContextBudget {
        total_chars,
        allocations: BTreeMap::new(),
        minimum_floor: minimum_floor.clone(),
    };

    let n = sections.len();
    match n {
        0 => return budget,
        1 => {
            budget.allocations.insert(sections[0].category, total_chars);
            return budget;
        }
        _ => {}
    }

    // More sections than the floor can cover would overdraw the budget
    let floor = floor_fraction.clamp(0.0, 1.0 / n as f64);
    let remaining = (1.0 - floor * n as f64).max(0.0);
    let total_weight: f64 = sections
        .iter()
        .map(|s| s.char_count as f64 * s.priority as f64)
        .sum();

    for section in sections {
        let allocation = if total_weight > 0.0 {
            let share = section.char_count as f64 * section.priority as f64 / total_weight;
            (total_chars as f64 * (floor + share * remaining)).floor() as usize
        } else {
            total_chars / n
        };
        budget.allocations.insert(section.category, allocation.min(total_chars));
    }

    top_up_minimums(&mut budget, sections);
    budget
}

fn top_up_minimums(budget: &mut ContextBudget, sections: &[SectionDemand]) {
    let min_of = |category: EvidenceCategory, budget: &ContextBudget| {
        budget.minimum_floor.get(&category).copied().unwrap_or(0)
    };

    let minimums_fit = sections
        .iter()
        .map(|s| min_of(s.category, budget))
        .sum::<usize>()
        <= budget.total_chars;

    let mut spare = budget.total_chars.saturating_sub(budget.allocated());

    // Higher-priority sections are topped up first
    let mut order: Vec<EvidenceCategory> = sections.iter().map(|s| s.category).collect();
    order.sort();

    for category in &order {
        let minimum = min_of(*category, budget);
        let mut need = minimum.saturating_sub(budget.allocation(*category));
        if need == 0 {
            continue;
        }

        let from_spare = need.min(spare);
        spare -= from_spare;
        need -= from_spare;
        *budget.allocations.entry(*category).or_insert(0) += from_spare;

        if need == 0 || !minimums_fit {
            continue;
        }

        // Borrow from the sections with the most room above their minimum
        let mut donors: Vec<(EvidenceCategory, usize)> = order
            .iter()
            .filter(|c| *c != category)
            .map(|c| (*c, budget.allocation(*c).saturating_sub(min_of(*c, budget))))
            .filter(|(_, surplus)| *surplus > 0)
            .collect();
        donors.sort_by(|a, b| b.1.cmp(&a.1));

        for (donor, surplus) in donors {
            let take = surplus.min(need);
            if let Some(alloc) = budget.allocations.get_mut(&donor) {
                *alloc -= take;
            }
            *budget.allocations.entry(*category).or_insert(0) += take;
            need -= take;
            if need == 0 {
                break;
            }
        }
    }
}
