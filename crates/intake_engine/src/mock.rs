use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use serde_json::{json, Value};

use intake_logging::intake_info;

use crate::dispatch::OcrQueue;
use crate::save::{RecordSaver, SaveRecordBody};
use crate::status::StatusFeed;
use crate::types::{
    DispatchError, JobStatusDto, PollError, RemoteStatus, ResultDto, SaveAck, SaveError,
};

/// Canned stand-in for the whole remote OCR service, mirroring the
/// mock-data fallback of the original client: every job reports
/// `processing` on its first poll and completes on the second with a small
/// two-item invoice payload.
#[derive(Debug, Default)]
pub struct MockOcrService {
    jobs: Mutex<Vec<MockJob>>,
    next_id: AtomicU64,
}

#[derive(Debug)]
struct MockJob {
    id: String,
    filename: String,
    polls: u32,
}

impl MockOcrService {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl OcrQueue for MockOcrService {
    async fn enqueue(
        &self,
        file_name: &str,
        _mime: &str,
        _bytes: Vec<u8>,
    ) -> Result<String, DispatchError> {
        let id = format!("mock-{}", self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let mut jobs = self.jobs.lock().map_err(|_| {
            DispatchError::Network("mock service state poisoned".to_string())
        })?;
        jobs.push(MockJob {
            id: id.clone(),
            filename: file_name.to_string(),
            polls: 0,
        });
        intake_info!("mock queue accepted {file_name} as {id}");
        Ok(id)
    }

    async fn start(&self, _job_id: &str) -> Result<(), DispatchError> {
        Ok(())
    }
}

#[async_trait::async_trait]
impl StatusFeed for MockOcrService {
    async fn fetch(&self) -> Result<Vec<JobStatusDto>, PollError> {
        let mut jobs = self
            .jobs
            .lock()
            .map_err(|_| PollError::Network("mock service state poisoned".to_string()))?;
        let statuses = jobs
            .iter_mut()
            .map(|job| {
                job.polls += 1;
                if job.polls < 2 {
                    JobStatusDto {
                        id: job.id.clone(),
                        status: RemoteStatus::Processing,
                        progress: Some(55),
                        result: None,
                    }
                } else {
                    JobStatusDto {
                        id: job.id.clone(),
                        status: RemoteStatus::Completed,
                        progress: Some(100),
                        result: Some(ResultDto {
                            ocr_data: Some(canned_invoice_payload(&job.filename)),
                            filename: Some(job.filename.clone()),
                            processed_at: Some("mock".to_string()),
                            message: None,
                        }),
                    }
                }
            })
            .collect();
        Ok(statuses)
    }
}

#[async_trait::async_trait]
impl RecordSaver for MockOcrService {
    async fn save(&self, _record: SaveRecordBody) -> Result<SaveAck, SaveError> {
        intake_info!("mock save accepted a record");
        Ok(SaveAck::default())
    }
}

/// A small invoice payload in the canonical shape, with the per-field
/// `{ value, is_confident }` records the UI expects.
pub fn canned_invoice_payload(filename: &str) -> Value {
    json!({
        "output": {
            "nomor_referensi": { "value": "INV-2023-001", "is_confident": true },
            "nama_supplier": { "value": "PT Supplier Utama", "is_confident": true },
            "tanggal_faktur": { "value": "2023-11-15", "is_confident": true },
            "tgl_jatuh_tempo": { "value": "2023-12-31", "is_confident": true },
            "include_ppn": { "value": true, "is_confident": true },
            "ppn_rate": { "value": 11, "is_confident": true, "from_database": true },
            "items": [
                {
                    "kode_barang_invoice": { "value": "ITM001", "is_confident": true },
                    "nama_barang_invoice": { "value": format!("Sample from {filename}"), "is_confident": false },
                    "qty": { "value": 5, "is_confident": true },
                    "satuan": { "value": "PCS", "is_confident": true },
                    "harga_satuan": { "value": 100000, "is_confident": true },
                    "jumlah_netto": { "value": 500000, "is_confident": true }
                },
                {
                    "kode_barang_invoice": { "value": "ITM002", "is_confident": true },
                    "nama_barang_invoice": { "value": "Produk Sample 2", "is_confident": true },
                    "qty": { "value": 2, "is_confident": true },
                    "satuan": { "value": "BOX", "is_confident": false },
                    "harga_satuan": { "value": 250000, "is_confident": true },
                    "jumlah_netto": { "value": 500000, "is_confident": true }
                }
            ]
        }
    })
}
