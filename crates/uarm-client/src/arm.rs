//! 运动控制器与驱动之间的接口

use uarm_driver::{DriverError, Uarm};
use uarm_protocol::Position;

/// 运动控制器所需的机械臂操作
///
/// `Uarm` 是唯一的生产实现；测试中可以用记录调用顺序的假实现替换。
pub trait ArmInterface {
    /// 发送移动命令（不等待到位）
    fn move_to(&self, target: Position, speed: u8) -> Result<(), DriverError>;

    /// 查询当前位置（超时返回原点）
    fn get_position(&self) -> Result<Position, DriverError>;

    /// 向下探测抓取
    fn pick(&self, distance: u16) -> Result<(), DriverError>;

    /// 气泵开关
    fn pump(&self, on: bool) -> Result<(), DriverError>;

    /// 锁定 / 释放全部舵机
    fn attach_detach_all(&self, attach: bool) -> Result<(), DriverError>;

    fn stop(&self) -> Result<(), DriverError>;

    /// 链路是否仍然可用（接收线程未因设备断开而退出）
    fn is_open(&self) -> bool {
        true
    }

    /// 关闭链路（可重复调用）
    fn close(&self);
}

impl ArmInterface for Uarm {
    fn move_to(&self, target: Position, speed: u8) -> Result<(), DriverError> {
        Uarm::move_to(self, target, speed)
    }

    fn get_position(&self) -> Result<Position, DriverError> {
        Uarm::get_position(self)
    }

    fn pick(&self, distance: u16) -> Result<(), DriverError> {
        Uarm::pick(self, distance)
    }

    fn pump(&self, on: bool) -> Result<(), DriverError> {
        Uarm::pump(self, on)
    }

    fn attach_detach_all(&self, attach: bool) -> Result<(), DriverError> {
        Uarm::attach_detach_all(self, attach)
    }

    fn stop(&self) -> Result<(), DriverError> {
        Uarm::stop(self)
    }

    fn is_open(&self) -> bool {
        Uarm::is_open(self)
    }

    fn close(&self) {
        Uarm::close(self)
    }
}

impl<A: ArmInterface + ?Sized> ArmInterface for Box<A> {
    fn move_to(&self, target: Position, speed: u8) -> Result<(), DriverError> {
        (**self).move_to(target, speed)
    }

    fn get_position(&self) -> Result<Position, DriverError> {
        (**self).get_position()
    }

    fn pick(&self, distance: u16) -> Result<(), DriverError> {
        (**self).pick(distance)
    }

    fn pump(&self, on: bool) -> Result<(), DriverError> {
        (**self).pump(on)
    }

    fn attach_detach_all(&self, attach: bool) -> Result<(), DriverError> {
        (**self).attach_detach_all(attach)
    }

    fn stop(&self) -> Result<(), DriverError> {
        (**self).stop()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn close(&self) {
        (**self).close()
    }
}
