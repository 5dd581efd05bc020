// Copyright 2025 pagecache Project Authors
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

/// Lifetime counters of a cache instance.
///
/// Counters are monotone; the call sites saturate instead of wrapping so hit
/// ratios stay meaningful over arbitrarily long runs.
#[derive(Debug, Default)]
pub struct Metrics {
    /// fetch operations since creation
    pub fetch: u64,
    /// fetch hits since creation
    pub hit: u64,
}
