use crate::models::{
    ClusterMember, ClusterResult, PerformanceCluster, PerformanceTier, RankedParticipant,
};
use crate::stats;

pub const MIN_PARTICIPANTS_FOR_CLUSTERING: usize = 4;
const MAX_CHARACTERISTICS: usize = 3;
const MULTI_TIER_VALIDITY: f64 = 0.75;
const SINGLE_TIER_VALIDITY: f64 = 0.5;

impl PerformanceTier {
    pub fn for_score(score: f64) -> Self {
        if score >= 80.0 {
            Self::HighPerformers
        } else if score >= 60.0 {
            Self::AveragePerformers
        } else {
            Self::DevelopingPerformers
        }
    }

    pub fn anchor(self) -> f64 {
        match self {
            Self::HighPerformers => 90.0,
            Self::AveragePerformers => 70.0,
            Self::DevelopingPerformers => 50.0,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::HighPerformers => "Participants scoring 80 or above",
            Self::AveragePerformers => "Participants scoring between 60 and 80",
            Self::DevelopingPerformers => "Participants scoring below 60",
        }
    }

    fn characteristic_traits(self, participant: &RankedParticipant) -> &[String] {
        match self {
            Self::HighPerformers | Self::AveragePerformers => &participant.standout_traits,
            Self::DevelopingPerformers => &participant.concern_areas,
        }
    }
}

const TIERS: [PerformanceTier; 3] = [
    PerformanceTier::HighPerformers,
    PerformanceTier::AveragePerformers,
    PerformanceTier::DevelopingPerformers,
];

/// Buckets participants into the three fixed score tiers. Returns `None`
/// when there are too few participants to make the split meaningful.
pub fn analyze_clusters(participants: &[RankedParticipant]) -> Option<ClusterResult> {
    if participants.len() < MIN_PARTICIPANTS_FOR_CLUSTERING {
        return None;
    }

    let clusters: Vec<PerformanceCluster> = TIERS
        .iter()
        .filter_map(|&tier| build_cluster(tier, participants))
        .collect();

    let cluster_validity = if clusters.len() > 1 {
        MULTI_TIER_VALIDITY
    } else {
        SINGLE_TIER_VALIDITY
    };

    Some(ClusterResult {
        clusters,
        cluster_validity,
    })
}

fn build_cluster(
    tier: PerformanceTier,
    participants: &[RankedParticipant],
) -> Option<PerformanceCluster> {
    let members: Vec<&RankedParticipant> = participants
        .iter()
        .filter(|p| PerformanceTier::for_score(p.participant.score()) == tier)
        .collect();

    if members.is_empty() {
        return None;
    }

    let mut characteristics: Vec<String> = Vec::new();
    for name in members.iter().flat_map(|p| tier.characteristic_traits(p)) {
        if characteristics.len() == MAX_CHARACTERISTICS {
            break;
        }
        if !characteristics.contains(name) {
            characteristics.push(name.clone());
        }
    }

    let scores: Vec<f64> = members.iter().map(|p| p.participant.score()).collect();
    let anchor = tier.anchor();

    Some(PerformanceCluster {
        tier,
        description: tier.description().to_string(),
        anchor_score: anchor,
        participant_count: members.len(),
        average_score: stats::mean(&scores),
        characteristics,
        members: members
            .iter()
            .map(|p| ClusterMember {
                participant_id: p.participant.user_id,
                name: p.participant.name.clone(),
                score: p.participant.score(),
                distance_from_center: (p.participant.score() - anchor).abs(),
            })
            .collect(),
    })
}
