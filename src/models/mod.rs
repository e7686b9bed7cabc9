// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod analysis;
pub mod pagination;
pub mod stats;
pub mod user;

pub use analysis::{Analysis, AnalysisMetadata, AnalysisSummary, NewAnalysis};
pub use pagination::Pagination;
pub use stats::{SegmentCount, StatsOverview};
pub use user::{NewUser, ProfileUpdate, User};
