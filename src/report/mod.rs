// Copyright © 2025 Stephan Kunz

//! The Report Aggregator: a pure per-batch accumulator of per-API counters.
//!
//! Owned exclusively by the batch consumer loop (§4.E: "single-writer; no locking
//! required"), so nothing here takes a lock — concurrent access is the caller's job,
//! the same division of labor `factory/batch.go`'s `pushReport`/`record` show.

pub mod error;

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::ConstString;
use crate::bot::ApiCall;

pub use error::Error;

/// Running per-API counters, keyed by the `api` field of every folded [`ApiCall`].
#[derive(Clone, Debug, Default)]
pub struct ApiDetail {
    /// Number of calls folded in for this api.
    pub req_num: i64,
    /// Number of those calls that carried a non-empty `err`.
    pub err_num: i64,
    /// Sum of `consume_ms` across every folded call, in nanoseconds.
    pub sum_consume_ns: i64,
    /// Sum of request body sizes, in bytes.
    pub req_size: i64,
    /// Sum of response body sizes, in bytes.
    pub res_size: i64,
}

impl ApiDetail {
    /// Average latency in milliseconds, or `0` if no calls were ever folded.
    ///
    /// §4.E: "If `req_num == 0` for an api (impossible given the update rule, but
    /// defended), the displayed average is '0 ms'."
    #[must_use]
    pub fn avg_ms(&self) -> i64 {
        if self.req_num == 0 {
            0
        } else {
            self.sum_consume_ns / (1_000_000 * self.req_num)
        }
    }
}

/// Per-batch accumulator, finalized once when the batch completes.
#[derive(Clone, Debug)]
pub struct ReportDetail {
    /// The batch id this report belongs to.
    pub id: ConstString,
    /// The tree/batch name.
    pub name: ConstString,
    /// When the batch started, used to compute throughput at finalization.
    pub begin_time: DateTime<Utc>,
    /// Number of bots whose report has been folded in.
    pub bot_num: i64,
    /// Total number of `ApiCall`s folded in, across every api.
    pub req_num: i64,
    /// Total number of those calls that carried a non-empty `err`.
    pub err_num: i64,
    /// Requests per second, computed only at [`ReportDetail::finalize`].
    pub tps: i64,
    /// Wall-clock duration of the batch run, formatted as e.g. `"12s"`.
    pub duration: String,
    /// Per-api counters, keyed by the URL the `Action` node called.
    pub url_map: BTreeMap<ConstString, ApiDetail>,
}

impl ReportDetail {
    /// A fresh, empty report for a batch starting now.
    #[must_use]
    pub fn new(id: ConstString, name: ConstString, begin_time: DateTime<Utc>) -> Self {
        Self {
            id,
            name,
            begin_time,
            bot_num: 0,
            req_num: 0,
            err_num: 0,
            tps: 0,
            duration: String::new(),
            url_map: BTreeMap::new(),
        }
    }

    /// Folds one bot's private report buffer into the batch-wide accumulator.
    pub fn fold(&mut self, calls: &[ApiCall]) {
        self.bot_num += 1;
        self.req_num += i64::try_from(calls.len()).unwrap_or(i64::MAX);
        for call in calls {
            let detail = self.url_map.entry(call.api.clone()).or_default();
            detail.req_num += 1;
            detail.sum_consume_ns += call.consume_ms.saturating_mul(1_000_000);
            detail.req_size += call.req_bytes;
            detail.res_size += call.res_bytes;
            if !call.err.is_empty() {
                self.err_num += 1;
                detail.err_num += 1;
            }
        }
    }

    /// Computes `tps`/`duration` against `now`, called once when the batch finishes.
    pub fn finalize(&mut self, now: DateTime<Utc>) {
        let elapsed_secs = (now - self.begin_time).num_seconds().max(1);
        self.tps = self.req_num / elapsed_secs;
        self.duration = format!("{elapsed_secs}s");
    }

    /// A human-readable finalization table, newest-batch-first convention left to the
    /// caller's ordering — this formats just the one report.
    ///
    /// Grounded on `factory/batch.go`'s `record()`, minus the ANSI coloring and the
    /// `fmt.Println` calls it otherwise used to build the same table.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "batch {} ({}): {} bots, {} requests, {} errors, {} qps, {}\n",
            self.id, self.name, self.bot_num, self.req_num, self.err_num, self.tps, self.duration
        ));
        for (api, detail) in &self.url_map {
            let succ = detail.req_num - detail.err_num;
            out.push_str(&format!(
                "  {:<40} reqs={:<6} avg={:<6}ms req/res={}kb/{}kb succ={}/{}\n",
                api,
                detail.req_num,
                detail.avg_ms(),
                detail.req_size / 1024,
                detail.res_size / 1024,
                succ,
                detail.req_num,
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn call(api: &str, consume_ms: i64, err: &str) -> ApiCall {
        ApiCall {
            api: api.into(),
            consume_ms,
            req_bytes: 10,
            res_bytes: 20,
            err: err.into(),
        }
    }

    #[test]
    fn fold_accumulates_and_tracks_errors() {
        let mut report = ReportDetail::new("b1".into(), "login".into(), Utc::now());
        report.fold(&[call("http://x/a", 10, ""), call("http://x/a", 20, "timeout")]);
        report.fold(&[call("http://x/b", 5, "")]);

        assert_eq!(report.bot_num, 2);
        assert_eq!(report.req_num, 3);
        assert_eq!(report.err_num, 1);
        let a = &report.url_map[&ConstString::from("http://x/a")];
        assert_eq!(a.req_num, 2);
        assert_eq!(a.err_num, 1);
        assert_eq!(a.avg_ms(), 15);
    }

    #[test]
    fn avg_ms_is_zero_for_untouched_api() {
        let detail = ApiDetail::default();
        assert_eq!(detail.avg_ms(), 0);
    }

    #[test]
    fn finalize_computes_tps_and_duration() {
        let begin = Utc::now() - ChronoDuration::seconds(10);
        let mut report = ReportDetail::new("b1".into(), "login".into(), begin);
        let calls: Vec<ApiCall> = (0..20).map(|_| call("http://x/a", 1, "")).collect();
        report.fold(&calls);
        report.finalize(begin + ChronoDuration::seconds(10));
        assert_eq!(report.tps, 2);
        assert_eq!(report.duration, "10s");
    }
}
