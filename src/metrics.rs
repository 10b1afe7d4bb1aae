use std::{
    collections::HashMap,
    sync::{Mutex, OnceLock},
};

static METRICS: OnceLock<Mutex<MetricsState>> = OnceLock::new();

struct MetricsState {
    total: u64,
    errors: u64,
    per_op: HashMap<&'static str, u64>,
    per_op_err: HashMap<&'static str, u64>,
    // 事件扫描统计
    scan_pages_total: u64,
    ownership_verify_total: u64,
    // 交易提交统计
    tx_submitted_total: u64,
    tx_confirmed_total: u64,
    tx_failed_total: u64,
}

fn state() -> &'static Mutex<MetricsState> {
    METRICS.get_or_init(|| {
        Mutex::new(MetricsState {
            total: 0,
            errors: 0,
            per_op: HashMap::new(),
            per_op_err: HashMap::new(),
            scan_pages_total: 0,
            ownership_verify_total: 0,
            tx_submitted_total: 0,
            tx_confirmed_total: 0,
            tx_failed_total: 0,
        })
    })
}

pub fn count_ok(op: &'static str) {
    let mut s = match state().lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(), // 避免因锁污染导致 panic
    };
    s.total += 1;
    *s.per_op.entry(op).or_insert(0) += 1;
}

pub fn count_err(op: &'static str) {
    let mut s = match state().lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    s.total += 1;
    s.errors += 1;
    *s.per_op.entry(op).or_insert(0) += 1;
    *s.per_op_err.entry(op).or_insert(0) += 1;
}

pub fn add_scan_pages(pages: u64) {
    let mut s = match state().lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    s.scan_pages_total += pages;
}

pub fn inc_ownership_verify() {
    let mut s = match state().lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    s.ownership_verify_total += 1;
}

pub fn inc_tx_submitted() {
    let mut s = match state().lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    s.tx_submitted_total += 1;
}

pub fn inc_tx_confirmed() {
    let mut s = match state().lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    s.tx_confirmed_total += 1;
}

pub fn inc_tx_failed() {
    let mut s = match state().lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    s.tx_failed_total += 1;
}

pub fn render_prometheus() -> String {
    let s = match state().lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    let mut out = String::new();
    out.push_str("# HELP zoocore_store_ops_total Total store operations\n");
    out.push_str("# TYPE zoocore_store_ops_total counter\n");
    out.push_str(&format!("zoocore_store_ops_total {}\n", s.total));

    out.push_str("# HELP zoocore_store_errors_total Total failed store operations\n");
    out.push_str("# TYPE zoocore_store_errors_total counter\n");
    out.push_str(&format!("zoocore_store_errors_total {}\n", s.errors));

    out.push_str("# HELP zoocore_op_total Operations per name\n");
    out.push_str("# TYPE zoocore_op_total counter\n");
    for (k, v) in s.per_op.iter() {
        out.push_str(&format!("zoocore_op_total{{op=\"{}\"}} {}\n", k, v));
    }

    out.push_str("# HELP zoocore_op_errors_total Errors per operation\n");
    out.push_str("# TYPE zoocore_op_errors_total counter\n");
    for (k, v) in s.per_op_err.iter() {
        out.push_str(&format!("zoocore_op_errors_total{{op=\"{}\"}} {}\n", k, v));
    }

    out.push_str("# HELP zoocore_scan_pages_total Transfer log pages scanned\n");
    out.push_str("# TYPE zoocore_scan_pages_total counter\n");
    out.push_str(&format!("zoocore_scan_pages_total {}\n", s.scan_pages_total));

    out.push_str("# HELP zoocore_ownership_verify_total ownerOf verification calls\n");
    out.push_str("# TYPE zoocore_ownership_verify_total counter\n");
    out.push_str(&format!(
        "zoocore_ownership_verify_total {}\n",
        s.ownership_verify_total
    ));

    out.push_str("# HELP zoocore_tx_submitted_total Transactions submitted\n");
    out.push_str("# TYPE zoocore_tx_submitted_total counter\n");
    out.push_str(&format!("zoocore_tx_submitted_total {}\n", s.tx_submitted_total));

    out.push_str("# HELP zoocore_tx_confirmed_total Tracked transactions confirmed\n");
    out.push_str("# TYPE zoocore_tx_confirmed_total counter\n");
    out.push_str(&format!("zoocore_tx_confirmed_total {}\n", s.tx_confirmed_total));

    out.push_str("# HELP zoocore_tx_failed_total Tracked transactions reverted\n");
    out.push_str("# TYPE zoocore_tx_failed_total counter\n");
    out.push_str(&format!("zoocore_tx_failed_total {}\n", s.tx_failed_total));

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_contains_counters() {
        count_ok("update_tokens_on_sale");
        count_err("set_user");
        let rendered = render_prometheus();
        assert!(rendered.contains("zoocore_store_ops_total"));
        assert!(rendered.contains("op=\"update_tokens_on_sale\""));
        assert!(rendered.contains("op=\"set_user\""));
    }
}
