//! Gamification engine
//!
//! Owns the scoring rules and badge thresholds. Score increments, the
//! score-history breakdown and badge awards are separate writes from the
//! document mutation that triggered them (at-least-once, never rolled
//! back); the caller invokes award_points exactly once per qualifying
//! event — the engine does not deduplicate events, only badge awards.

use crate::models::{Badge, ScoreAction, UserRole};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use std::collections::HashSet;
use uuid::Uuid;

// =============================================================================
// Badge definitions
// =============================================================================

/// Cumulative counters the badge thresholds are defined over.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngagementCounters {
    pub score: i64,
    pub upload_count: i64,
    pub approved_upload_count: i64,
    pub review_count: i64,
    pub likes_received: i64,
}

pub struct BadgeDef {
    pub name: &'static str,
    pub threshold: fn(&EngagementCounters) -> bool,
}

/// The standard badge set, in award-evaluation order.
pub const BADGES: &[BadgeDef] = &[
    BadgeDef {
        name: "First Upload",
        threshold: |c| c.score >= 10 || c.upload_count >= 1,
    },
    BadgeDef {
        name: "Rising Star",
        threshold: |c| c.score >= 50,
    },
    BadgeDef {
        name: "Top Contributor",
        threshold: |c| c.score >= 100,
    },
    BadgeDef {
        name: "Knowledge Guru",
        threshold: |c| c.approved_upload_count >= 10,
    },
    BadgeDef {
        name: "Mentor",
        threshold: |c| c.review_count >= 20,
    },
    BadgeDef {
        name: "Popular",
        threshold: |c| c.likes_received >= 50,
    },
];

/// Badges whose threshold is met and that the user does not yet hold.
pub fn newly_earned(counters: &EngagementCounters, held: &HashSet<String>) -> Vec<&'static str> {
    BADGES
        .iter()
        .filter(|def| !held.contains(def.name) && (def.threshold)(counters))
        .map(|def| def.name)
        .collect()
}

// =============================================================================
// Leaderboard
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LeaderboardPeriod {
    #[default]
    All,
    Week,
    Month,
}

impl LeaderboardPeriod {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_lowercase()).as_deref() {
            Some("week") => LeaderboardPeriod::Week,
            Some("month") => LeaderboardPeriod::Month,
            _ => LeaderboardPeriod::All,
        }
    }
}

#[derive(Debug, FromRow)]
struct LeaderboardRow {
    id: Uuid,
    username: String,
    display_name: Option<String>,
    role: UserRole,
    score: i64,
    badge_count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: i64,
    pub user_id: Uuid,
    pub username: String,
    pub display_name: Option<String>,
    pub role: UserRole,
    pub score: i64,
    pub badge_count: i64,
}

/// Dense 1-based ranks over scores already sorted descending: equal
/// scores share a rank, the next distinct score gets rank + 1.
pub fn assign_dense_ranks(scores: &[i64]) -> Vec<i64> {
    let mut ranks = Vec::with_capacity(scores.len());
    let mut rank = 0i64;
    let mut previous: Option<i64> = None;

    for &score in scores {
        if previous != Some(score) {
            rank += 1;
            previous = Some(score);
        }
        ranks.push(rank);
    }

    ranks
}

// =============================================================================
// Engine
// =============================================================================

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ScoreHistoryEntry {
    pub id: Uuid,
    pub action: ScoreAction,
    pub points: i32,
    pub description: Option<String>,
    pub related_document_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub user_id: Uuid,
    pub score: i32,
    pub history: Vec<ScoreHistoryEntry>,
}

#[derive(Debug)]
pub struct AwardOutcome {
    pub points: i32,
    pub new_score: i32,
    pub new_badges: Vec<Badge>,
}

#[derive(Clone)]
pub struct GamificationEngine {
    pool: PgPool,
}

impl GamificationEngine {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Increment the user's score for one qualifying event, record the
    /// breakdown entry, then re-evaluate badges.
    ///
    /// Returns None (and mutates nothing) when the user does not exist.
    pub async fn award_points(
        &self,
        user_id: Uuid,
        action: ScoreAction,
        description: &str,
        related_document_id: Option<Uuid>,
    ) -> Result<Option<AwardOutcome>, sqlx::Error> {
        let points = action.points();

        let new_score: Option<i32> = sqlx::query_scalar(
            "UPDATE users SET score = score + $2 WHERE id = $1 RETURNING score",
        )
        .bind(user_id)
        .bind(points)
        .fetch_optional(&self.pool)
        .await?;

        let new_score = match new_score {
            Some(score) => score,
            None => return Ok(None),
        };

        sqlx::query(
            r#"
            INSERT INTO score_history (user_id, action, points, description, related_document_id)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(user_id)
        .bind(action)
        .bind(points)
        .bind(description)
        .bind(related_document_id)
        .execute(&self.pool)
        .await?;

        let new_badges = self.evaluate_badges(user_id).await?.unwrap_or_default();

        Ok(Some(AwardOutcome {
            points,
            new_score,
            new_badges,
        }))
    }

    /// Award every badge whose threshold the user now meets and does not
    /// yet hold. Idempotent: the (user_id, name) primary key plus
    /// ON CONFLICT DO NOTHING make a repeat award impossible.
    ///
    /// Returns the newly awarded badges so the caller can fan out
    /// notifications and audit entries; None when the user is unknown.
    pub async fn evaluate_badges(
        &self,
        user_id: Uuid,
    ) -> Result<Option<Vec<Badge>>, sqlx::Error> {
        let counters = match self.load_counters(user_id).await? {
            Some(counters) => counters,
            None => return Ok(None),
        };

        let held: HashSet<String> =
            sqlx::query_scalar::<_, String>("SELECT name FROM user_badges WHERE user_id = $1")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?
                .into_iter()
                .collect();

        let mut awarded = Vec::new();
        for name in newly_earned(&counters, &held) {
            let earned_at: Option<DateTime<Utc>> = sqlx::query_scalar(
                r#"
                INSERT INTO user_badges (user_id, name)
                VALUES ($1, $2)
                ON CONFLICT (user_id, name) DO NOTHING
                RETURNING earned_at
                "#,
            )
            .bind(user_id)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

            // A concurrent award may have won the insert; only the winner
            // reports the badge as new.
            if let Some(earned_at) = earned_at {
                awarded.push(Badge {
                    name: name.to_string(),
                    earned_at,
                });
            }
        }

        Ok(Some(awarded))
    }

    async fn load_counters(
        &self,
        user_id: Uuid,
    ) -> Result<Option<EngagementCounters>, sqlx::Error> {
        let score: Option<i32> = sqlx::query_scalar("SELECT score FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        let score = match score {
            Some(score) => score,
            None => return Ok(None),
        };

        let upload_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM score_history WHERE user_id = $1 AND action = 'upload'",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        let review_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM score_history WHERE user_id = $1 AND action = 'review'",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        let approved_upload_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM documents WHERE uploader_id = $1 AND status = 'approved'",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        let likes_received: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM document_likes l
            JOIN documents d ON d.id = l.document_id
            WHERE d.uploader_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(Some(EngagementCounters {
            score: score as i64,
            upload_count,
            approved_upload_count,
            review_count,
            likes_received,
        }))
    }

    /// Active users ranked by score (dense 1-based ranks), truncated to
    /// `limit`. Week/month periods rank by points earned in the window.
    pub async fn leaderboard(
        &self,
        limit: i64,
        period: LeaderboardPeriod,
    ) -> Result<Vec<LeaderboardEntry>, sqlx::Error> {
        let rows: Vec<LeaderboardRow> = match period {
            LeaderboardPeriod::All => {
                sqlx::query_as(
                    r#"
                    SELECT u.id, u.username, u.display_name, u.role, u.score::bigint AS score,
                           (SELECT COUNT(*) FROM user_badges b WHERE b.user_id = u.id) AS badge_count
                    FROM users u
                    WHERE u.is_active = TRUE
                    ORDER BY u.score DESC, u.created_at ASC
                    LIMIT $1
                    "#,
                )
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            LeaderboardPeriod::Week | LeaderboardPeriod::Month => {
                let window = match period {
                    LeaderboardPeriod::Week => "7 days",
                    _ => "30 days",
                };
                sqlx::query_as(
                    r#"
                    SELECT u.id, u.username, u.display_name, u.role,
                           COALESCE((SELECT SUM(h.points) FROM score_history h
                                     WHERE h.user_id = u.id
                                       AND h.created_at > NOW() - $2::interval), 0)::bigint AS score,
                           (SELECT COUNT(*) FROM user_badges b WHERE b.user_id = u.id) AS badge_count
                    FROM users u
                    WHERE u.is_active = TRUE
                    ORDER BY score DESC, u.created_at ASC
                    LIMIT $1
                    "#,
                )
                .bind(limit)
                .bind(window)
                .fetch_all(&self.pool)
                .await?
            }
        };

        let scores: Vec<i64> = rows.iter().map(|r| r.score).collect();
        let ranks = assign_dense_ranks(&scores);

        Ok(rows
            .into_iter()
            .zip(ranks)
            .map(|(row, rank)| LeaderboardEntry {
                rank,
                user_id: row.id,
                username: row.username,
                display_name: row.display_name,
                role: row.role,
                score: row.score,
                badge_count: row.badge_count,
            })
            .collect())
    }

    /// Current score plus the full history breakdown; None for unknown users.
    pub async fn score_breakdown(
        &self,
        user_id: Uuid,
    ) -> Result<Option<ScoreBreakdown>, sqlx::Error> {
        let score: Option<i32> = sqlx::query_scalar("SELECT score FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        let score = match score {
            Some(score) => score,
            None => return Ok(None),
        };

        let history: Vec<ScoreHistoryEntry> = sqlx::query_as(
            r#"
            SELECT id, action, points, description, related_document_id, created_at
            FROM score_history
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(ScoreBreakdown {
            user_id,
            score,
            history,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn held(names: &[&str]) -> HashSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_first_upload_by_score_or_count() {
        let by_score = EngagementCounters {
            score: 10,
            ..Default::default()
        };
        assert!(newly_earned(&by_score, &held(&[])).contains(&"First Upload"));

        let by_count = EngagementCounters {
            upload_count: 1,
            ..Default::default()
        };
        assert!(newly_earned(&by_count, &held(&[])).contains(&"First Upload"));

        let neither = EngagementCounters::default();
        assert!(!newly_earned(&neither, &held(&[])).contains(&"First Upload"));
    }

    #[test]
    fn test_score_thresholds() {
        let counters = EngagementCounters {
            score: 105,
            ..Default::default()
        };
        let earned = newly_earned(&counters, &held(&[]));
        assert!(earned.contains(&"Rising Star"));
        assert!(earned.contains(&"Top Contributor"));
    }

    #[test]
    fn test_crossing_100_awards_top_contributor() {
        // score 95 + an approval bonus of 10
        let before = EngagementCounters {
            score: 95,
            upload_count: 3,
            ..Default::default()
        };
        let already = held(&["First Upload", "Rising Star"]);
        assert!(newly_earned(&before, &already).is_empty());

        let after = EngagementCounters {
            score: 105,
            upload_count: 3,
            ..Default::default()
        };
        assert_eq!(newly_earned(&after, &already), vec!["Top Contributor"]);
    }

    #[test]
    fn test_held_badges_are_never_reawarded() {
        let counters = EngagementCounters {
            score: 200,
            upload_count: 20,
            approved_upload_count: 15,
            review_count: 30,
            likes_received: 60,
        };
        let all = held(&[
            "First Upload",
            "Rising Star",
            "Top Contributor",
            "Knowledge Guru",
            "Mentor",
            "Popular",
        ]);
        assert!(newly_earned(&counters, &all).is_empty());
    }

    #[test]
    fn test_evaluation_is_idempotent_without_counter_change() {
        let counters = EngagementCounters {
            score: 50,
            upload_count: 2,
            ..Default::default()
        };
        let first = newly_earned(&counters, &held(&[]));
        assert_eq!(first, vec!["First Upload", "Rising Star"]);

        let now_held = held(&first);
        assert!(newly_earned(&counters, &now_held).is_empty());
    }

    #[test]
    fn test_mentor_and_popular_counters() {
        let counters = EngagementCounters {
            review_count: 20,
            likes_received: 50,
            ..Default::default()
        };
        let earned = newly_earned(&counters, &held(&[]));
        assert!(earned.contains(&"Mentor"));
        assert!(earned.contains(&"Popular"));
    }

    #[test]
    fn test_dense_ranks_without_ties() {
        assert_eq!(assign_dense_ranks(&[100, 80, 60]), vec![1, 2, 3]);
    }

    #[test]
    fn test_dense_ranks_with_ties_have_no_gaps() {
        assert_eq!(assign_dense_ranks(&[100, 100, 80, 80, 60]), vec![1, 1, 2, 2, 3]);
    }

    #[test]
    fn test_dense_ranks_empty() {
        assert!(assign_dense_ranks(&[]).is_empty());
    }

    #[test]
    fn test_leaderboard_period_parsing() {
        assert_eq!(LeaderboardPeriod::parse(None), LeaderboardPeriod::All);
        assert_eq!(LeaderboardPeriod::parse(Some("week")), LeaderboardPeriod::Week);
        assert_eq!(LeaderboardPeriod::parse(Some("MONTH")), LeaderboardPeriod::Month);
        assert_eq!(LeaderboardPeriod::parse(Some("bogus")), LeaderboardPeriod::All);
    }
}
