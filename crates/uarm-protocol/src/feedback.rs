//! 响应帧解析（设备 → 主机）
//!
//! 负载布局：
//!
//! | 响应码 | 负载 |
//! |---|---|
//! | `AttachedState` (1) | `[servo, attached]` |
//! | `ServoAngle` (2) | `[servo, angle_hi, angle_lo]` |
//! | `Position` (3) | `[x_hi, x_lo, y_hi, y_lo, z_hi, z_lo]` |

use crate::{
    HEADER_RESPONSE_BYTE, Position, ProtocolError, ResponseCode, UarmFrame, join_i16, split_i16,
};

/// 已解码的设备响应
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeviceResponse {
    /// 锁定状态
    ///
    /// 设备偶尔发送只有帧头的状态帧，此时 `attached` 为 `false`。
    AttachedState { servo: u8, attached: bool },
    /// 舵机角度（0.1°）
    ServoAngle { servo: u8, angle: i16 },
    /// 末端位置
    Position(Position),
}

impl DeviceResponse {
    pub fn code(&self) -> ResponseCode {
        match self {
            DeviceResponse::AttachedState { .. } => ResponseCode::AttachedState,
            DeviceResponse::ServoAngle { .. } => ResponseCode::ServoAngle,
            DeviceResponse::Position(_) => ResponseCode::Position,
        }
    }

    /// 编码为响应帧（设备侧 / 模拟器使用）
    pub fn to_frame(&self) -> UarmFrame {
        let mut payload = [0u8; 6];
        let len = match *self {
            DeviceResponse::AttachedState { servo, attached } => {
                payload[0] = servo;
                payload[1] = attached as u8;
                2
            },
            DeviceResponse::ServoAngle { servo, angle } => {
                let [hi, lo] = split_i16(angle);
                payload[..3].copy_from_slice(&[servo, hi, lo]);
                3
            },
            DeviceResponse::Position(p) => {
                let [xh, xl] = split_i16(p.x);
                let [yh, yl] = split_i16(p.y);
                let [zh, zl] = split_i16(p.z);
                payload = [xh, xl, yh, yl, zh, zl];
                6
            },
        };

        let mut data = [0u8; crate::FRAME_CAPACITY];
        data[0] = HEADER_RESPONSE_BYTE;
        data[1] = self.code().into();
        data[2] = len as u8;
        data[crate::HEADER_SIZE..crate::HEADER_SIZE + len].copy_from_slice(&payload[..len]);
        UarmFrame::from_buffer(data, crate::HEADER_SIZE + len)
    }
}

impl TryFrom<&UarmFrame> for DeviceResponse {
    type Error = ProtocolError;

    fn try_from(frame: &UarmFrame) -> Result<Self, Self::Error> {
        if frame.marker() != HEADER_RESPONSE_BYTE {
            return Err(ProtocolError::InvalidMarker {
                byte: frame.marker(),
            });
        }

        let code = frame.code();
        let code =
            ResponseCode::try_from(code).map_err(|_| ProtocolError::UnknownResponse { code })?;
        let p = frame.payload();

        match code {
            ResponseCode::AttachedState => Ok(DeviceResponse::AttachedState {
                servo: p.first().copied().unwrap_or(0),
                attached: p.get(1).is_some_and(|&b| b != 0),
            }),
            ResponseCode::ServoAngle => {
                if p.len() < 3 {
                    return Err(ProtocolError::InvalidLength {
                        expected: 3,
                        actual: p.len(),
                    });
                }
                Ok(DeviceResponse::ServoAngle {
                    servo: p[0],
                    angle: join_i16(p[1], p[2]),
                })
            },
            ResponseCode::Position => {
                if p.len() < 6 {
                    return Err(ProtocolError::InvalidLength {
                        expected: 6,
                        actual: p.len(),
                    });
                }
                Ok(DeviceResponse::Position(Position::new(
                    join_i16(p[0], p[1]),
                    join_i16(p[2], p[3]),
                    join_i16(p[4], p[5]),
                )))
            },
        }
    }
}

impl TryFrom<UarmFrame> for DeviceResponse {
    type Error = ProtocolError;

    fn try_from(frame: UarmFrame) -> Result<Self, Self::Error> {
        DeviceResponse::try_from(&frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn response(code: u8, payload: &[u8]) -> UarmFrame {
        UarmFrame::new(HEADER_RESPONSE_BYTE, code, payload).unwrap()
    }

    #[test]
    fn test_position_decode() {
        // x=300, y=-131, z=60
        let frame = response(0x03, &[2, 44, 0xFF, 0xFD, 0, 60]);
        let decoded = DeviceResponse::try_from(&frame).unwrap();
        let DeviceResponse::Position(p) = decoded else {
            panic!("expected position");
        };
        assert!(p.exact_eq(&Position::new(300, -131, 60)));
    }

    #[test]
    fn test_angle_decode() {
        let frame = response(0x02, &[1, 14, 8]);
        assert_eq!(
            DeviceResponse::try_from(&frame).unwrap(),
            DeviceResponse::ServoAngle {
                servo: 1,
                angle: 1800
            }
        );
    }

    #[test]
    fn test_attached_decode() {
        let frame = response(0x01, &[0xFF, 1]);
        assert_eq!(
            DeviceResponse::try_from(&frame).unwrap(),
            DeviceResponse::AttachedState {
                servo: 0xFF,
                attached: true
            }
        );
    }

    /// 只有帧头的状态帧：未锁定
    #[test]
    fn test_attached_header_only() {
        let frame = response(0x01, &[]);
        assert_eq!(
            DeviceResponse::try_from(&frame).unwrap(),
            DeviceResponse::AttachedState {
                servo: 0,
                attached: false
            }
        );
    }

    #[test]
    fn test_short_position_rejected() {
        let frame = response(0x03, &[0, 1, 0, 2]);
        assert!(matches!(
            DeviceResponse::try_from(&frame),
            Err(ProtocolError::InvalidLength {
                expected: 6,
                actual: 4
            })
        ));
    }

    #[test]
    fn test_unknown_code() {
        let frame = response(0x42, &[]);
        assert!(matches!(
            DeviceResponse::try_from(&frame),
            Err(ProtocolError::UnknownResponse { code: 0x42 })
        ));
    }

    #[test]
    fn test_to_frame_layout() {
        let frame = DeviceResponse::Position(Position::new(50, 150, 60)).to_frame();
        assert_eq!(frame.as_bytes(), &[0xBB, 0x03, 0x06, 0, 50, 1, 22, 0, 60]);

        let frame = DeviceResponse::AttachedState {
            servo: 2,
            attached: false,
        }
        .to_frame();
        assert_eq!(frame.as_bytes(), &[0xBB, 0x01, 0x02, 0x02, 0x00]);
    }

    proptest! {
        /// ±16383 范围内坐标经线上编码后解码不变
        #[test]
        fn prop_position_wire_roundtrip(
            x in -16383i16..=16383,
            y in -16383i16..=16383,
            z in -16383i16..=16383,
        ) {
            let frame = DeviceResponse::Position(Position::new(x, y, z)).to_frame();
            let DeviceResponse::Position(p) = DeviceResponse::try_from(&frame).unwrap() else {
                panic!("expected position");
            };
            prop_assert_eq!((p.x, p.y, p.z), (x, y, z));
        }
    }
}
