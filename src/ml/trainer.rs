// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Teacher-forced training with per-epoch beam search validation.
//
// Per epoch:
//   1. train   forward_loss → backward → optimizer step
//              (gradient norm clipped to 1.0)
//   2. valid   model.valid() drops to the inner backend, then
//              BLEU on the validation split
//   3. record  metrics.csv row, history.json, model_epoch_{n},
//              optim_epoch_{n}, and model_best when BLEU >= best
//              so far
//
// After the last epoch model_final is saved and the test split
// is scored.
//
// Both optimisers go through the same generic loop; only the
// OptimizerAdaptor type differs.
//
// Reference: Burn Book §5, Sutskever et al. (2014)

use anyhow::Result;
use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    grad_clipping::GradientClippingConfig,
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer, SgdConfig},
    prelude::*,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::{TranslationBatch, TranslationBatcher},
    dataset::TranslationDataset,
};
use crate::infra::{
    checkpoint::{epoch_model, epoch_optimizer, CheckpointManager, TrainingHistory, BEST_MODEL, FINAL_MODEL},
    metrics::{EpochMetrics, MetricsLogger},
    tokenizer_store::Vocabulary,
};
use crate::ml::backend::{select_device, InferBackend, TrainBackend};
use crate::ml::evaluator::{evaluate, EvalOptions};
use crate::ml::generation::DecodeStrategy;
use crate::ml::model::Seq2SeqModel;

type TrainDevice = <TrainBackend as Backend>::Device;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizerKind {
    Sgd,
    Adam,
}

/// Max L2 norm of the gradient
const CLIP_NORM: f32 = 1.0;

pub struct TrainingData {
    pub train: TranslationDataset,
    pub val:   TranslationDataset,
    pub test:  TranslationDataset,
}

/// Vocabularies the run was built with
pub struct Vocabs<'a> {
    pub src: &'a Vocabulary,
    pub trg: &'a Vocabulary,
}

pub fn run_training(
    cfg:    &TrainConfig,
    data:   TrainingData,
    vocabs: Vocabs<'_>,
    ckpt:   &CheckpointManager,
) -> Result<TrainingHistory> {
    let device = select_device(cfg.cpu);
    TrainBackend::seed(cfg.seed);

    let model_cfg = cfg.model_config(vocabs.src.len(), vocabs.trg.len());
    let mut model: Seq2SeqModel<TrainBackend> = model_cfg.init(&device);
    tracing::info!(
        "Model ready: {} {:?} layers, emb={}, hidden={}",
        cfg.num_layers, cfg.rnn_type, cfg.emb_dim, cfg.hidden_dim
    );

    let mut history = TrainingHistory::default();
    if cfg.resume {
        match ckpt.load_history()? {
            Some(h) if h.epoch > 0 => {
                model = ckpt.load_model(model, &epoch_model(h.epoch), &device)?;
                tracing::info!("Resuming after epoch {}", h.epoch);
                history = h;
            }
            _ => tracing::warn!("--resume given but no finished epoch found; starting fresh"),
        }
    }

    let clip = Some(GradientClippingConfig::Norm(CLIP_NORM));
    match cfg.optimizer {
        OptimizerKind::Sgd => {
            let optim = SgdConfig::new().with_gradient_clipping(clip).init();
            fit(cfg, model, optim, data, vocabs, ckpt, history, device)
        }
        OptimizerKind::Adam => {
            let optim = AdamConfig::new().with_grad_clipping(clip).init();
            fit(cfg, model, optim, data, vocabs, ckpt, history, device)
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn fit<O>(
    cfg:         &TrainConfig,
    mut model:   Seq2SeqModel<TrainBackend>,
    mut optim:   O,
    data:        TrainingData,
    vocabs:      Vocabs<'_>,
    ckpt:        &CheckpointManager,
    mut history: TrainingHistory,
    device:      TrainDevice,
) -> Result<TrainingHistory>
where
    O: Optimizer<Seq2SeqModel<TrainBackend>, TrainBackend>,
{
    let pad = vocabs.trg.special_tokens().pad;
    let metrics = MetricsLogger::new(ckpt.dir())?;

    // history.epoch is only non-zero when resuming
    if history.epoch > 0 {
        optim = ckpt.load_optimizer(optim, &epoch_optimizer(history.epoch), &device)?;
    }

    // ── Data loaders ──────────────────────────────────────────────────────────
    tracing::info!(
        "Samples: {} train, {} validation, {} test",
        data.train.sample_count(),
        data.val.sample_count(),
        data.test.sample_count(),
    );
    let train_loader = DataLoaderBuilder::new(TranslationBatcher::<TrainBackend>::new(device.clone(), pad))
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(1)
        .build(data.train);
    let val_loader  = inference_loader(cfg, data.val, pad, &device);
    let test_loader = inference_loader(cfg, data.test, pad, &device);

    let strategy = DecodeStrategy::Beam(cfg.search.clone());
    let first = history.epoch + 1;
    let last  = history.epoch + cfg.epochs;

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in first..=last {
        let mut loss_sum = 0.0f64;
        let mut batches  = 0usize;

        for batch in train_loader.iter() {
            let loss = model.forward_loss(batch.src, batch.trg, pad);
            loss_sum += loss.clone().into_scalar().elem::<f64>();
            batches  += 1;

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(cfg.lr, model, grads);
        }
        let train_loss = if batches > 0 { loss_sum / batches as f64 } else { f64::NAN };

        let valid = model.valid();
        let options = EvalOptions {
            strategy:      &strategy,
            max_length:    None,
            print_example: cfg.verbose > 1,
        };
        let bleu = evaluate(&valid, &*val_loader, vocabs.trg, &options, &device)?;

        println!(
            "[{}/{}] Train loss: {:.4}, BLEU score: {:.4}",
            epoch, last, train_loss, bleu,
        );

        let m = EpochMetrics::new(epoch, train_loss, bleu);
        metrics.log(&m)?;
        ckpt.save_model(&model, &epoch_model(epoch))?;
        ckpt.save_optimizer(&optim, &epoch_optimizer(epoch))?;
        if history.record(&m) {
            ckpt.save_model(&model, BEST_MODEL)?;
            println!("Best Model Updated");
        }
        ckpt.save_history(&history)?;
    }

    ckpt.save_model(&model, FINAL_MODEL)?;
    tracing::info!("Training complete, final model saved");

    let options = EvalOptions {
        strategy:      &strategy,
        max_length:    None,
        print_example: cfg.verbose >= 1,
    };
    let test_bleu = evaluate(&model.valid(), &*test_loader, vocabs.trg, &options, &device)?;
    println!("Test BLEU score: {:.2}", test_bleu);

    Ok(history)
}

fn inference_loader(
    cfg:     &TrainConfig,
    dataset: TranslationDataset,
    pad:     u32,
    device:  &TrainDevice,
) -> Arc<dyn DataLoader<TranslationBatch<InferBackend>>> {
    DataLoaderBuilder::new(TranslationBatcher::<InferBackend>::new(device.clone(), pad))
        .batch_size(cfg.batch_size)
        .num_workers(1)
        .build(dataset)
}
