// Copyright 2026 Boundless Foundation, Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Operator CLI for the protocol points crawler: batch preparation, balance
//! ingestion, points computation and publication, schedule/referral/KYC
//! management, the Hydro pot allocator and a read-only leaderboard API.

pub mod api;
pub mod commands;
pub mod config;
pub mod lcd;
pub mod pricefeed;
pub mod publisher;
pub mod sources;
