#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use tristar_bridge::prelude::*;
use tristar_bridge::tristar::REGISTER_COUNT;

pub fn common_setup() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub struct Factory;

impl Factory {
    /// A full block with scaling [12.00 V, 5.00 A] and everything else zero.
    pub fn raw_block() -> Vec<u16> {
        let mut raw = vec![0; REGISTER_COUNT];
        raw[0] = 12;
        raw[1] = 0;
        raw[2] = 5;
        raw[3] = 0;
        raw
    }

    /// A realistic mid-afternoon snapshot of a 24V system in MPPT.
    pub fn charging_block() -> Vec<u16> {
        let mut raw = vec![0; REGISTER_COUNT];
        raw[0] = 180;
        raw[1] = 0;
        raw[2] = 80;
        raw[3] = 0;
        raw[24] = 4915; // ~26.9 V
        raw[26] = 4910;
        raw[27] = 11650; // ~64 V
        raw[28] = 5734; // ~14 A
        raw[29] = 4915;
        raw[35] = 31;
        raw[36] = 22;
        raw[38] = 4912;
        raw[39] = 5700;
        raw[50] = 5;
        raw[51] = 5188;
        raw[58] = 3200;
        raw[59] = 3400;
        raw[64] = 4370;
        raw[65] = 5200;
        raw[77] = 1800;
        raw[78] = 0;
        raw[79] = 600;
        raw
    }
}

/// Hands out queued responses, then repeats the fallback forever.
pub struct MockSource {
    responses: Mutex<VecDeque<Result<Vec<u16>>>>,
    fallback: Vec<u16>,
    unit_id: u8,
}

impl MockSource {
    pub fn new(fallback: Vec<u16>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            fallback,
            unit_id: 1,
        }
    }

    pub fn with_responses(fallback: Vec<u16>, responses: Vec<Result<Vec<u16>>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            fallback,
            unit_id: 1,
        }
    }
}

#[async_trait]
impl RegisterSource for MockSource {
    async fn read_registers(&self) -> Result<Vec<u16>> {
        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(response) => response,
            None => Ok(self.fallback.clone()),
        }
    }

    fn unit_id(&self) -> u8 {
        self.unit_id
    }
}

/// Takes `delay` to answer every read, like a device on a slow link.
pub struct SlowSource {
    block: Vec<u16>,
    delay: std::time::Duration,
}

impl SlowSource {
    pub fn new(block: Vec<u16>, delay: std::time::Duration) -> Self {
        Self { block, delay }
    }
}

#[async_trait]
impl RegisterSource for SlowSource {
    async fn read_registers(&self) -> Result<Vec<u16>> {
        tokio::time::sleep(self.delay).await;
        Ok(self.block.clone())
    }

    fn unit_id(&self) -> u8 {
        1
    }
}
