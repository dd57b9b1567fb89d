// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Field extraction from OLT table output.
//!
//! Pure functions over captured text, independent of the transport. The
//! ONT tables share a `NO PON ONU SERIAL ...` column prefix; a row is
//! selected by the serial column, never by position in the output.

use regex::Regex;
use serde::Serialize;

use crate::error::{Error, Result};

/// `NO PON ONU SERIAL`
const REGISTERED_ROW: &str = r"^\s*\d+\s+(\d+)\s+(\d+)\s+(\S+)";
/// `NO PON SERIAL`, autofind on firmware that has no ONU column yet
const AUTOFIND_ROW: &str = r"^\s*\d+\s+(\d+)\s+(\S+)";
/// `NO PON ONU SERIAL ONLINE ACTIVE`
const INFO_ROW: &str = r"^\s*\d+\s+(\d+)\s+(\d+)\s+(\S+)\s+(\S+)\s+(\S+)";
/// `ONTID :5`, `ONT-ID=5` and similar in the confirm acknowledgement
const CONFIRMED_ONU: &str = r"(?i)\bONT\s*-?ID\s*[:=]?\s*(\d+)";
/// `NO PON ONU SERIAL ONLINE ACTIVE RX TX`
const OPTICAL_ROW: &str =
    r"^\s*\d+\s+(\d+)\s+(\d+)\s+(\S+)\s+(\S+)\s+(\S+)\s+(-?[\d.]+)\s+(-?[\d.]+)";

/// Position of an ONT on the OLT
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LocatedOnt {
    pub pon_id: u32,
    /// Absent in autofind tables that only list the port
    pub onu_id: Option<u32>,
}

/// Registered ONT row from `show ont info`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OntInfo {
    pub pon_id: u32,
    pub onu_id: u32,
    pub gpon_serial: String,
    pub online_status: String,
    pub active_status: String,
}

/// Complete optical status of one ONT
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedOntRecord {
    pub pon_id: u32,
    pub onu_id: u32,
    pub gpon_serial: String,
    pub online_status: String,
    pub active_status: String,
    pub rx_dbm: f64,
    pub tx_dbm: f64,
}

/// `show system-info` fields; keys the firmware does not print are `None`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OltSystemInfo {
    pub system_description: Option<String>,
    pub system_name: Option<String>,
    pub location: Option<String>,
    pub contact_info: Option<String>,
    pub hardware_version: Option<String>,
    pub software_version: Option<String>,
    pub bootloader_version: Option<String>,
    pub mac_address: Option<String>,
    pub serial_number: Option<String>,
    pub system_time: Option<String>,
    pub running_time: Option<String>,
}

fn pattern(source: &str) -> Result<Regex> {
    Regex::new(source).map_err(|e| Error::parse_failure("pattern", &e.to_string()))
}

/// Lines mentioning `serial`, minus command echoes and `%` device messages
fn candidate_lines<'a>(text: &'a str, serial: &'a str) -> impl Iterator<Item = &'a str> {
    text.lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(move |line| line.contains(serial))
        .filter(|line| !line.contains("show ont") && !line.trim_start().starts_with('%'))
}

fn not_found(serial: &str, range: &str) -> Error {
    Error::DeviceNotFound {
        serial: serial.to_string(),
        range: range.to_string(),
    }
}

/// Finds the PON (and ONU, when listed) of `serial` in an autofind or
/// info table.
///
/// A row that mentions the serial but matches neither table layout is a
/// `ParseFailure`; `DeviceNotFound` means no row mentions it at all.
pub fn locate_ont(text: &str, serial: &str, range: &str) -> Result<LocatedOnt> {
    let registered = pattern(REGISTERED_ROW)?;
    let autofind = pattern(AUTOFIND_ROW)?;
    let mut unreadable = None;

    for line in candidate_lines(text, serial) {
        if let Some(caps) = registered.captures(line) {
            if caps[3].contains(serial) {
                if let (Ok(pon_id), Ok(onu_id)) = (caps[1].parse(), caps[2].parse()) {
                    return Ok(LocatedOnt {
                        pon_id,
                        onu_id: Some(onu_id),
                    });
                }
            }
        }
        match autofind.captures(line) {
            Some(caps) if caps[2].contains(serial) => {
                if let Ok(pon_id) = caps[1].parse() {
                    return Ok(LocatedOnt {
                        pon_id,
                        onu_id: None,
                    });
                }
                unreadable.get_or_insert(line);
            }
            Some(_) => {}
            None => {
                unreadable.get_or_insert(line);
            }
        }
    }
    match unreadable {
        Some(line) => Err(Error::parse_failure("autofind", line)),
        None => Err(not_found(serial, range)),
    }
}

/// Registered ONT row for `serial`, with its online and active status
pub fn parse_ont_info(text: &str, serial: &str, range: &str) -> Result<OntInfo> {
    let row = pattern(INFO_ROW)?;
    let mut unreadable = None;

    for line in candidate_lines(text, serial) {
        let Some(caps) = row.captures(line) else {
            unreadable.get_or_insert(line);
            continue;
        };
        if !caps[3].contains(serial) {
            continue;
        }
        if let (Ok(pon_id), Ok(onu_id)) = (caps[1].parse(), caps[2].parse()) {
            return Ok(OntInfo {
                pon_id,
                onu_id,
                gpon_serial: caps[3].to_string(),
                online_status: caps[4].to_string(),
                active_status: caps[5].to_string(),
            });
        }
        unreadable.get_or_insert(line);
    }
    match unreadable {
        Some(line) => Err(Error::parse_failure("ont-info", line)),
        None => Err(not_found(serial, range)),
    }
}

/// Optical row for `serial` at `pon_id`/`onu_id`.
///
/// A missing row, a row for another position, or an unreadable power
/// value is a `ParseFailure`; no partial record is returned.
pub fn parse_optical_info(
    text: &str,
    pon_id: u32,
    onu_id: u32,
    serial: &str,
) -> Result<ParsedOntRecord> {
    let row = pattern(OPTICAL_ROW)?;

    for line in candidate_lines(text, serial) {
        let Some(caps) = row.captures(line) else {
            continue;
        };
        if !caps[3].contains(serial) {
            continue;
        }
        let position: (Option<u32>, Option<u32>) = (caps[1].parse().ok(), caps[2].parse().ok());
        if position != (Some(pon_id), Some(onu_id)) {
            tracing::debug!(
                "Optical row for {} reports {}/{}, expected {}/{}",
                serial,
                &caps[1],
                &caps[2],
                pon_id,
                onu_id
            );
            continue;
        }
        let (Ok(rx_dbm), Ok(tx_dbm)) = (caps[6].parse::<f64>(), caps[7].parse::<f64>()) else {
            return Err(Error::parse_failure("optical-info", line));
        };
        return Ok(ParsedOntRecord {
            pon_id,
            onu_id,
            gpon_serial: caps[3].to_string(),
            online_status: caps[4].to_string(),
            active_status: caps[5].to_string(),
            rx_dbm,
            tx_dbm,
        });
    }
    Err(Error::parse_failure("optical-info", text))
}

/// ONU index the OLT reports after `ont confirm`, when it prints one
pub fn parse_confirmed_onu(text: &str) -> Option<u32> {
    let re = Regex::new(CONFIRMED_ONU).ok()?;
    re.captures(text).and_then(|caps| caps[1].parse().ok())
}

fn key_value(text: &str, key: &str) -> Option<String> {
    let re = Regex::new(&format!(r"{}[ \t]*-[ \t]*(.*)", regex::escape(key))).ok()?;
    re.captures(text)
        .map(|caps| caps[1].trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Reads the `Key - Value` lines of `show system-info`
pub fn parse_system_info(text: &str) -> OltSystemInfo {
    OltSystemInfo {
        system_description: key_value(text, "System Description"),
        system_name: key_value(text, "System Name"),
        location: key_value(text, "System Location"),
        contact_info: key_value(text, "Contact Information"),
        hardware_version: key_value(text, "Hardware Version"),
        software_version: key_value(text, "Software Version"),
        bootloader_version: key_value(text, "Bootloader Version"),
        mac_address: key_value(text, "Mac Address"),
        serial_number: key_value(text, "Serial Number"),
        system_time: key_value(text, "System Time"),
        running_time: key_value(text, "Running Time"),
    }
}
