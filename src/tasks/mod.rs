//! Background scheduled tasks for the application.
//!
//! A single recurring driver executes the consistency passes (points
//! reconciliation, referral expiry, event lifecycle, ticket exhaustion,
//! promotion expiry, transaction completion) in a fixed order per tick.
//! Call `spawn_sweeper` once during startup to launch it.

use crate::services::SweeperService;

/// Spawn the consistency sweeper loop.
///
/// Notes
/// - Passes are idempotent and isolated: one pass failing is logged and the
///   remaining passes of the same tick still run.
/// - This function detaches the loop via `tokio::spawn`; it does not block.
pub fn spawn_sweeper(sweeper: SweeperService, interval_secs: u64) {
    tokio::spawn(async move {
        loop {
            run_cycle(&sweeper).await;
            tokio::time::sleep(std::time::Duration::from_secs(interval_secs)).await;
        }
    });
}

// 固定顺序执行六个扫描；一轮跑完才睡眠，避免同一任务的重叠执行
async fn run_cycle(sweeper: &SweeperService) {
    match sweeper.reconcile_user_points().await {
        Ok(n) if n > 0 => log::info!("User points reconciled: {n}"),
        Ok(_) => {}
        Err(e) => log::error!("Failed to reconcile user points: {e:?}"),
    }

    match sweeper.expire_referral_histories().await {
        Ok(n) if n > 0 => log::info!("Referral histories expired: {n}"),
        Ok(_) => {}
        Err(e) => log::error!("Failed to expire referral histories: {e:?}"),
    }

    match sweeper.end_finished_events().await {
        Ok(n) if n > 0 => log::info!("Events marked as ended: {n}"),
        Ok(_) => {}
        Err(e) => log::error!("Failed to update event status: {e:?}"),
    }

    match sweeper.flag_sold_out_tickets().await {
        Ok(n) if n > 0 => log::info!("Tickets marked as sold out: {n}"),
        Ok(_) => {}
        Err(e) => log::error!("Failed to update ticket availability: {e:?}"),
    }

    match sweeper.invalidate_promotions().await {
        Ok(n) if n > 0 => log::info!("Promotions invalidated: {n}"),
        Ok(_) => {}
        Err(e) => log::error!("Failed to update promotion status: {e:?}"),
    }

    match sweeper.complete_transactions().await {
        Ok(n) if n > 0 => log::info!("Transactions completed: {n}"),
        Ok(_) => {}
        Err(e) => log::error!("Failed to update transaction status: {e:?}"),
    }
}
