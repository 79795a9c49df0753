use crate::{
    clock::DayBoundary,
    error::{LedgerError, LedgerResult},
    level::{LevelTable, LevelThreshold},
    retry::RetryPolicy,
    types::Points,
};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, str::FromStr};

// ── Activity kinds ─────────────────────────────────────────────────

/// Every platform action that can earn points.
/// Variants are added as features ship — never removed or renamed,
/// the string form is persisted in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityKind {
    BlogPost,
    BlogComment,
    BlogLike,
    NewsComment,
    DiscussionPost,
    DiscussionReply,
    PollCreate,
    PollVote,
    SurveyComplete,
    GroupJoin,
    LessonComplete,
    CourseComplete,
    DailyLogin,
    StreakBonus,
}

impl ActivityKind {
    pub const ALL: [ActivityKind; 14] = [
        Self::BlogPost,
        Self::BlogComment,
        Self::BlogLike,
        Self::NewsComment,
        Self::DiscussionPost,
        Self::DiscussionReply,
        Self::PollCreate,
        Self::PollVote,
        Self::SurveyComplete,
        Self::GroupJoin,
        Self::LessonComplete,
        Self::CourseComplete,
        Self::DailyLogin,
        Self::StreakBonus,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BlogPost        => "BLOG_POST",
            Self::BlogComment     => "BLOG_COMMENT",
            Self::BlogLike        => "BLOG_LIKE",
            Self::NewsComment     => "NEWS_COMMENT",
            Self::DiscussionPost  => "DISCUSSION_POST",
            Self::DiscussionReply => "DISCUSSION_REPLY",
            Self::PollCreate      => "POLL_CREATE",
            Self::PollVote        => "POLL_VOTE",
            Self::SurveyComplete  => "SURVEY_COMPLETE",
            Self::GroupJoin       => "GROUP_JOIN",
            Self::LessonComplete  => "LESSON_COMPLETE",
            Self::CourseComplete  => "COURSE_COMPLETE",
            Self::DailyLogin      => "DAILY_LOGIN",
            Self::StreakBonus     => "STREAK_BONUS",
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityKind {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| LedgerError::UnknownActivityKind(s.to_string()))
    }
}

// ── Rules ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRule {
    pub points:      Points,
    /// Max awards per user per calendar day. 0 = unlimited.
    pub daily_limit: u32,
    pub label:       String,
}

impl ActivityRule {
    pub fn new(points: Points, daily_limit: u32, label: &str) -> Self {
        Self { points, daily_limit, label: label.to_string() }
    }
}

/// One row of the "how to earn points" catalog shown to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityConfigView {
    pub kind:        ActivityKind,
    pub label:       String,
    pub points:      Points,
    pub daily_limit: u32,
}

#[derive(Debug, Clone, Deserialize)]
struct ActivityRuleEntry {
    kind:        ActivityKind,
    points:      Points,
    daily_limit: u32,
    label:       String,
}

#[derive(Debug, Clone, Deserialize)]
struct ActivityPointsFile {
    activities: Vec<ActivityRuleEntry>,
    #[serde(default = "default_streak_threshold")]
    streak_threshold: u32,
    #[serde(default = "default_history_limit")]
    history_limit: usize,
    #[serde(default = "default_weekly_window_days")]
    weekly_window_days: i64,
    #[serde(default)]
    day_boundary: DayBoundary,
    #[serde(default)]
    retry: RetryPolicy,
}

#[derive(Debug, Clone, Deserialize)]
struct LevelThresholdsFile {
    levels: Vec<LevelThreshold>,
}

fn default_streak_threshold() -> u32 { 7 }
fn default_history_limit() -> usize { 50 }
fn default_weekly_window_days() -> i64 { 7 }

// ── PointsConfig ───────────────────────────────────────────────────

/// The immutable points configuration. Built once at startup and shared
/// (behind an `Arc`) by the award engine, streak tracker and summary service.
#[derive(Debug, Clone)]
pub struct PointsConfig {
    pub activities:         BTreeMap<ActivityKind, ActivityRule>,
    pub levels:             LevelTable,
    /// Consecutive days before STREAK_BONUS starts paying out.
    pub streak_threshold:   u32,
    /// Bounded length of the per-account display history.
    pub history_limit:      usize,
    pub weekly_window_days: i64,
    pub day_boundary:       DayBoundary,
    pub retry:              RetryPolicy,
}

impl PointsConfig {
    /// Load from the data/ directory.
    /// In tests, use PointsConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/points/activity_points.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let file: ActivityPointsFile = serde_json::from_str(&content)?;

        let mut activities = BTreeMap::new();
        for entry in file.activities {
            let rule = ActivityRule {
                points:      entry.points,
                daily_limit: entry.daily_limit,
                label:       entry.label,
            };
            if activities.insert(entry.kind, rule).is_some() {
                anyhow::bail!("{path}: activity {} configured twice", entry.kind);
            }
        }

        let level_path = format!("{data_dir}/points/level_thresholds.json");
        let level_content = std::fs::read_to_string(&level_path)
            .map_err(|e| anyhow::anyhow!("Cannot read {level_path}: {e}"))?;
        let level_file: LevelThresholdsFile = serde_json::from_str(&level_content)?;

        let config = Self {
            activities,
            levels:             LevelTable::new(level_file.levels)?,
            streak_threshold:   file.streak_threshold,
            history_limit:      file.history_limit,
            weekly_window_days: file.weekly_window_days,
            day_boundary:       file.day_boundary,
            retry:              file.retry,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> LedgerResult<()> {
        for (kind, rule) in &self.activities {
            if rule.points <= 0 {
                return Err(LedgerError::config(format!(
                    "{kind} must award a positive number of points, got {}",
                    rule.points
                )));
            }
        }
        if self.streak_threshold == 0 {
            return Err(LedgerError::config("streak_threshold must be at least 1"));
        }
        if self.weekly_window_days <= 0 {
            return Err(LedgerError::config("weekly_window_days must be positive"));
        }
        if !self.day_boundary.is_valid() {
            return Err(LedgerError::config(format!(
                "day boundary offset out of range: {:?}",
                self.day_boundary
            )));
        }
        Ok(())
    }

    pub fn rule(&self, kind: ActivityKind) -> Option<&ActivityRule> {
        self.activities.get(&kind)
    }

    /// The points catalog, in activity order.
    pub fn catalog(&self) -> Vec<ActivityConfigView> {
        self.activities
            .iter()
            .map(|(kind, rule)| ActivityConfigView {
                kind:        *kind,
                label:       rule.label.clone(),
                points:      rule.points,
                daily_limit: rule.daily_limit,
            })
            .collect()
    }

    /// Config with hardcoded defaults for use in unit tests.
    ///
    /// Days are bucketed on UTC midnight and NEWS_COMMENT is left
    /// unconfigured so tests can exercise the unknown-kind path.
    pub fn default_test() -> Self {
        let activities = [
            (ActivityKind::BlogPost,        ActivityRule::new(15, 1, "Publish a blog post")),
            (ActivityKind::BlogComment,     ActivityRule::new(5, 10, "Comment on a blog post")),
            (ActivityKind::BlogLike,        ActivityRule::new(1, 20, "Like a blog post")),
            (ActivityKind::DiscussionPost,  ActivityRule::new(10, 3, "Start a discussion")),
            (ActivityKind::DiscussionReply, ActivityRule::new(5, 10, "Reply to a discussion")),
            (ActivityKind::PollCreate,      ActivityRule::new(10, 2, "Create a poll")),
            (ActivityKind::PollVote,        ActivityRule::new(3, 0, "Vote in a poll")),
            (ActivityKind::SurveyComplete,  ActivityRule::new(10, 0, "Complete a survey")),
            (ActivityKind::GroupJoin,       ActivityRule::new(5, 5, "Join a group")),
            (ActivityKind::LessonComplete,  ActivityRule::new(5, 20, "Complete a lesson")),
            (ActivityKind::CourseComplete,  ActivityRule::new(50, 0, "Complete a course")),
            (ActivityKind::DailyLogin,      ActivityRule::new(5, 1, "Daily login")),
            (ActivityKind::StreakBonus,     ActivityRule::new(20, 1, "7-day streak bonus")),
        ]
        .into_iter()
        .collect();

        Self {
            activities,
            levels: LevelTable::new(vec![
                LevelThreshold { level: 1, min_points: 0,   title: "Newcomer".into() },
                LevelThreshold { level: 2, min_points: 50,  title: "Contributor".into() },
                LevelThreshold { level: 3, min_points: 150, title: "Regular".into() },
                LevelThreshold { level: 4, min_points: 400, title: "Champion".into() },
            ])
            .expect("static test level table is valid"),
            streak_threshold:   7,
            history_limit:      10,
            weekly_window_days: 7,
            day_boundary:       DayBoundary::UTC,
            retry:              RetryPolicy::default(),
        }
    }
}

impl Default for PointsConfig {
    /// The built-in production table, used when no data directory is given.
    fn default() -> Self {
        let activities = [
            (ActivityKind::BlogPost,        ActivityRule::new(20, 3, "Publish a blog post")),
            (ActivityKind::BlogComment,     ActivityRule::new(5, 10, "Comment on a blog post")),
            (ActivityKind::BlogLike,        ActivityRule::new(1, 25, "Like a blog post")),
            (ActivityKind::NewsComment,     ActivityRule::new(3, 10, "Comment on news")),
            (ActivityKind::DiscussionPost,  ActivityRule::new(10, 5, "Start a discussion")),
            (ActivityKind::DiscussionReply, ActivityRule::new(5, 15, "Reply to a discussion")),
            (ActivityKind::PollCreate,      ActivityRule::new(10, 3, "Create a poll")),
            (ActivityKind::PollVote,        ActivityRule::new(3, 0, "Vote in a poll")),
            (ActivityKind::SurveyComplete,  ActivityRule::new(10, 0, "Complete a survey")),
            (ActivityKind::GroupJoin,       ActivityRule::new(5, 5, "Join a group")),
            (ActivityKind::LessonComplete,  ActivityRule::new(10, 10, "Complete a lesson")),
            (ActivityKind::CourseComplete,  ActivityRule::new(50, 0, "Complete a course")),
            (ActivityKind::DailyLogin,      ActivityRule::new(5, 1, "Daily login")),
            (ActivityKind::StreakBonus,     ActivityRule::new(25, 1, "7-day streak bonus")),
        ]
        .into_iter()
        .collect();

        let levels = [
            (1, 0,     "Newcomer"),
            (2, 100,   "Contributor"),
            (3, 300,   "Regular"),
            (4, 600,   "Active Member"),
            (5, 1_000, "Enthusiast"),
            (6, 2_000, "Expert"),
            (7, 3_500, "Champion"),
            (8, 5_000, "Legend"),
        ]
        .into_iter()
        .map(|(level, min_points, title)| LevelThreshold { level, min_points, title: title.into() })
        .collect();

        Self {
            activities,
            levels: LevelTable::new(levels).expect("built-in level table is valid"),
            streak_threshold:   default_streak_threshold(),
            history_limit:      default_history_limit(),
            weekly_window_days: default_weekly_window_days(),
            day_boundary:       DayBoundary::Local,
            retry:              RetryPolicy::default(),
        }
    }
}
