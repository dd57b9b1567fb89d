// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! RouterOS response parsing helpers

use crate::mikrotik::types::{
    IpPool, PppProfile, PppSecret, RateLimit, RouterboardInfo, SystemResource,
};

use super::Row;

fn text(row: &Row, key: &str, fallback: &str) -> String {
    row.get(key).cloned().unwrap_or_else(|| fallback.to_string())
}

fn number(row: &Row, key: &str) -> u64 {
    row.get(key).and_then(|v| v.parse().ok()).unwrap_or(0)
}

fn optional(row: &Row, key: &str) -> Option<String> {
    row.get(key).filter(|v| !v.is_empty()).cloned()
}

pub(crate) fn parse_system(rows: &[Row]) -> SystemResource {
    let empty = Row::new();
    let first = rows
        .iter()
        .find(|s| s.contains_key("version"))
        .unwrap_or(&empty);
    SystemResource {
        uptime: text(first, "uptime", "0s"),
        cpu_load: number(first, "cpu-load"),
        free_memory: number(first, "free-memory"),
        total_memory: number(first, "total-memory"),
        version: text(first, "version", "unknown"),
        board_name: text(first, "board-name", "unknown"),
        architecture_name: text(first, "architecture-name", "unknown"),
        cpu: text(first, "cpu", "unknown"),
    }
}

pub(crate) fn parse_routerboard(rows: &[Row]) -> RouterboardInfo {
    let empty = Row::new();
    let first = rows.first().unwrap_or(&empty);
    RouterboardInfo {
        model: text(first, "model", "unknown"),
        serial_number: optional(first, "serial-number"),
        current_firmware: text(first, "current-firmware", "unknown"),
        upgrade_firmware: optional(first, "upgrade-firmware"),
    }
}

pub(crate) fn parse_secrets(rows: &[Row]) -> Vec<PppSecret> {
    rows.iter()
        .filter_map(|s| {
            let name = s.get("name")?;
            Some(PppSecret {
                id: optional(s, ".id"),
                name: name.clone(),
                password: String::new(),
                service: text(s, "service", "any"),
                profile: text(s, "profile", "default"),
                comment: optional(s, "comment"),
                disabled: s.get("disabled").is_some_and(|v| v == "true"),
            })
        })
        .collect()
}

pub(crate) fn parse_profiles(rows: &[Row]) -> Vec<PppProfile> {
    rows.iter()
        .filter_map(|s| {
            let name = s.get("name")?;
            Some(PppProfile {
                id: optional(s, ".id"),
                name: name.clone(),
                rate_limit: s.get("rate-limit").and_then(|v| RateLimit::parse(v)),
                local_address: optional(s, "local-address"),
                remote_address: optional(s, "remote-address"),
                comment: optional(s, "comment"),
            })
        })
        .collect()
}

pub(crate) fn parse_pools(rows: &[Row]) -> Vec<IpPool> {
    rows.iter()
        .filter_map(|s| {
            Some(IpPool {
                id: s.get(".id")?.clone(),
                name: s.get("name")?.clone(),
                ranges: text(s, "ranges", ""),
                next_pool: optional(s, "next-pool"),
            })
        })
        .collect()
}
